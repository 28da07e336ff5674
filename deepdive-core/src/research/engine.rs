//! Research engine: the single entry point for answering a question.

use super::orchestrator::{OrchestrationResult, Orchestrator};
use super::pipeline::{AgentResult, ResearchPipeline};
use super::session::{NoOpResearchCallback, ResearchCallback};
use crate::config::{ResearchConfig, ResearchMode};
use crate::error::ConfigError;
use crate::oracle::{LlmProvider, ReasoningOracle};
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// What a research call produced: orchestrated runs aggregate sub-agents,
/// single runs are one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResearchOutcome {
    Orchestrated(OrchestrationResult),
    Single(AgentResult),
}

impl ResearchOutcome {
    pub fn final_answer(&self) -> &str {
        match self {
            ResearchOutcome::Orchestrated(result) => &result.final_answer,
            ResearchOutcome::Single(result) => &result.final_answer,
        }
    }

    /// Aggregate confidence for orchestrated runs, the agent's score otherwise.
    pub fn confidence(&self) -> f64 {
        match self {
            ResearchOutcome::Orchestrated(result) => result.aggregate_confidence,
            ResearchOutcome::Single(result) => result.confidence_score,
        }
    }

    /// Pretty-printed JSON for persisting the full outcome.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Configured engine. Every [`research`](Self::research) call gets its own
/// oracle wrapper and experience pool; nothing carries over between calls.
pub struct ResearchEngine {
    config: Arc<ResearchConfig>,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    callback: Arc<dyn ResearchCallback>,
}

impl ResearchEngine {
    /// Create a new research engine. Invalid configuration is rejected here.
    pub fn new(
        config: ResearchConfig,
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tools = tools.with_timeout(config.tool_timeout_secs.map(Duration::from_secs));
        Ok(Self {
            config: Arc::new(config),
            provider,
            tools: Arc::new(tools),
            callback: Arc::new(NoOpResearchCallback),
        })
    }

    pub fn with_callback(mut self, callback: Arc<dyn ResearchCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research a question in the configured mode.
    pub async fn research(&self, question: &str) -> crate::Result<ResearchOutcome> {
        let oracle = Arc::new(
            ReasoningOracle::new(self.provider.clone())
                .with_system_prompt(self.config.system_prompt.clone())
                .with_max_retries(self.config.oracle_max_retries),
        );
        let pipeline = ResearchPipeline::new(
            oracle.clone(),
            self.tools.clone(),
            self.config.clone(),
            self.callback.clone(),
        )?;
        info!(
            mode = %self.config.mode,
            task_type = %self.config.task_type,
            model = oracle.model_name(),
            "Starting research"
        );

        Ok(match self.config.mode {
            ResearchMode::Orchestrated => {
                let orchestrator =
                    Orchestrator::new(oracle, pipeline, &self.config, self.callback.clone())?;
                ResearchOutcome::Orchestrated(orchestrator.run(question).await)
            }
            ResearchMode::Single => ResearchOutcome::Single(pipeline.run(question).await),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskType;
    use crate::oracle::MockLlmProvider;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ResearchConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let result = ResearchEngine::new(
            config,
            Arc::new(MockLlmProvider::new()),
            ToolRegistry::new(),
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_single_mode_returns_agent_result() {
        let config = ResearchConfig {
            mode: ResearchMode::Single,
            task_type: TaskType::Simple,
            system_prompt: Some("Be brief.".into()),
            ..Default::default()
        };
        let provider = Arc::new(MockLlmProvider::with_response("Rust is a language."));
        let engine = ResearchEngine::new(config, provider.clone(), ToolRegistry::new()).unwrap();

        let outcome = engine.research("What is Rust?").await.unwrap();
        let ResearchOutcome::Single(result) = &outcome else {
            panic!("expected a single-agent outcome");
        };
        assert_eq!(result.final_answer, "Rust is a language.");
        assert_eq!(outcome.final_answer(), "Rust is a language.");
        assert_eq!(outcome.confidence(), 1.0);

        let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();
        assert_eq!(json["mode"], "single");
        assert_eq!(json["confidence_score"], 1.0);
        assert!(
            provider
                .received_requests()
                .iter()
                .all(|r| r.messages[0].content == "Be brief.")
        );
    }
}
