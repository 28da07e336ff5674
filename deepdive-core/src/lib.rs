//! # DeepDive Core
//!
//! Core library for the DeepDive research engine.
//! Provides the reasoning-oracle interface, tool registry, bounded worker
//! pool, research pipeline with its hypothesis loop, the multi-agent
//! orchestrator, configuration, and fundamental types.

pub mod config;
pub mod error;
pub mod oracle;
pub mod research;
pub mod tools;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{ConfigOverrides, ResearchConfig, ResearchMode, TaskType, load_config};
pub use error::{ConfigError, DeepDiveError, LlmError, Result, TaskError, ToolError};
pub use oracle::{LlmProvider, MockLlmProvider, ReasoningOracle, ReplayScript, ScriptedLlmProvider};
pub use research::{
    AgentResult, AgentStatus, AnswerConfidence, ExperiencePool, ExperiencePoolEntry, Hypothesis,
    HypothesisStatus, NoOpResearchCallback, OrchestrationResult, Problem, ResearchCallback,
    ResearchEngine, ResearchOutcome, ResearchPhase, SynthesizedContext, TaskResult, TaskStatus,
    WorkerPool,
};
pub use tools::{StaticTool, Tool, ToolInvocation, ToolRegistry};
pub use types::{CompletionRequest, CompletionResponse, Message, OracleCall, Role, TokenUsage};
