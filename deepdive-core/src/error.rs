//! Error types for the DeepDive research core.
//!
//! Uses `thiserror` for public API error types. Each failure class the engine
//! distinguishes (oracle, tool, task, configuration) has its own enum; they fold
//! into [`DeepDiveError`] at component boundaries.

use std::path::PathBuf;

/// Top-level error type for the DeepDive core library.
#[derive(Debug, thiserror::Error)]
pub enum DeepDiveError {
    #[error("Oracle error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from reasoning-oracle interactions.
///
/// Transport failures and unparseable structured output both land here; the
/// enclosing unit (task, loop step, sub-agent) decides how to contain them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("Could not parse {call} response: {message}")]
    ResponseParse { call: String, message: String },

    #[error("Context window exceeded: used {used} of {limit} tokens")]
    ContextOverflow { used: usize, limit: usize },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from tool registration and invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Tool already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Tool '{name}' execution failed: {message}")]
    ExecutionFailed { name: String, message: String },

    #[error("Tool '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
}

/// Errors that prevent a concurrent unit of work from producing its result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    Oracle(#[from] LlmError),

    #[error("Worker panicked: {message}")]
    Panicked { message: String },

    #[error("Worker was aborted before completing")]
    Aborted,
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `DeepDiveError`.
pub type Result<T> = std::result::Result<T, DeepDiveError>;
