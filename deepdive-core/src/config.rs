//! Configuration system for DeepDive.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/deepdive/config.toml` and/or `.deepdive/config.toml`
//! in the workspace directory.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Whether a research pipeline runs the hypothesis loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Fact lookup: research then answer, no hypothesis loop.
    Simple,
    /// Always run the hypothesis loop.
    Complex,
    /// Resolved at decomposition time.
    #[default]
    Auto,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Simple => write!(f, "simple"),
            TaskType::Complex => write!(f, "complex"),
            TaskType::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(TaskType::Simple),
            "complex" => Ok(TaskType::Complex),
            "auto" => Ok(TaskType::Auto),
            other => Err(format!(
                "unknown task type '{other}' (expected simple, complex or auto)"
            )),
        }
    }
}

/// Top-level entry shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
    /// Decompose into sub-agents and aggregate.
    #[default]
    Orchestrated,
    /// Run one research pipeline on the question directly.
    Single,
}

impl std::fmt::Display for ResearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchMode::Orchestrated => write!(f, "orchestrated"),
            ResearchMode::Single => write!(f, "single"),
        }
    }
}

/// Configuration for the research engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Concurrency bound for both task and sub-agent fan-out.
    pub max_workers: usize,
    /// Hard ceiling on hypothesis loop cycles.
    pub max_iterations: usize,
    pub task_type: TaskType,
    pub mode: ResearchMode,
    /// Forwarded verbatim to every oracle call.
    pub system_prompt: Option<String>,
    /// Confidence at or above which an unlabelled verdict counts as verified.
    pub acceptance_threshold: f64,
    pub max_hypotheses_per_iteration: usize,
    /// Transient-error retries inside the oracle wrapper.
    pub oracle_max_retries: usize,
    /// Per-invocation tool deadline in seconds.
    pub tool_timeout_secs: Option<u64>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            max_iterations: 3,
            task_type: TaskType::Auto,
            mode: ResearchMode::Orchestrated,
            system_prompt: None,
            acceptance_threshold: 0.6,
            max_hypotheses_per_iteration: 4,
            oracle_max_retries: 0,
            tool_timeout_secs: None,
        }
    }
}

impl ResearchConfig {
    /// Reject values the engine cannot run with. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid {
                message: "max_workers must be at least 1".to_string(),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                message: "max_iterations must be at least 1".to_string(),
            });
        }
        if self.max_hypotheses_per_iteration == 0 {
            return Err(ConfigError::Invalid {
                message: "max_hypotheses_per_iteration must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "acceptance_threshold must be within [0, 1], got {}",
                    self.acceptance_threshold
                ),
            });
        }
        if self.tool_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                message: "tool_timeout_secs must be positive when set".to_string(),
            });
        }
        Ok(())
    }
}

/// Explicit values that win over every other configuration layer.
///
/// Unset fields leave the layered value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ResearchMode>,
}

/// Load configuration from layered sources, then validate it.
///
/// Order: defaults, user config, workspace `.deepdive/config.toml`,
/// `DEEPDIVE_*` environment variables, explicit overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<ResearchConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ResearchConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "deepdive", "deepdive") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".deepdive").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (DEEPDIVE_MAX_WORKERS, DEEPDIVE_TASK_TYPE, etc.)
    figment = figment.merge(Env::prefixed("DEEPDIVE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: ResearchConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Check whether any DeepDive configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "deepdive", "deepdive") {
        if config_dir.config_dir().join("config.toml").exists() {
            return true;
        }
    }
    workspace.is_some_and(|ws| ws.join(".deepdive").join("config.toml").exists())
}
