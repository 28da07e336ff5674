//! Orchestrator: splits a question into sub-problems, runs one research
//! pipeline per sub-problem on the worker pool, and aggregates the answers.

use super::decomposition::QuestionDecomposer;
use super::dispatcher::WorkerPool;
use super::hypothesis::mean_confidence;
use super::pipeline::{AgentResult, ResearchPipeline};
use super::problem::Problem;
use super::prompts;
use super::session::{ResearchCallback, ResearchPhase};
use crate::config::ResearchConfig;
use crate::error::ConfigError;
use crate::oracle::ReasoningOracle;
use crate::types::{OracleCall, TokenUsage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Top-level result of an orchestrated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub original_question: String,
    /// One entry per sub-problem, in sub-problem order.
    pub sub_results: Vec<AgentResult>,
    /// Mean of sub-agent confidences; failed sub-agents count as 0.0.
    pub aggregate_confidence: f64,
    pub final_answer: String,
    /// Indices of sub-agents that failed.
    pub failed_sub_agents: Vec<usize>,
    /// Indices of completed sub-agents that skipped the hypothesis loop.
    /// Their share of `aggregate_confidence` is research coverage, not
    /// verified-hypothesis confidence.
    pub direct_research_sub_agents: Vec<usize>,
    /// Set when the aggregation call failed and `final_answer` is the plain
    /// concatenation of sub-answers.
    pub aggregation_error: Option<String>,
    pub usage: TokenUsage,
}

pub struct Orchestrator {
    oracle: Arc<ReasoningOracle>,
    pipeline: ResearchPipeline,
    callback: Arc<dyn ResearchCallback>,
    pool: WorkerPool,
}

impl Orchestrator {
    pub fn new(
        oracle: Arc<ReasoningOracle>,
        pipeline: ResearchPipeline,
        config: &ResearchConfig,
        callback: Arc<dyn ResearchCallback>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            oracle,
            pipeline,
            callback,
            pool: WorkerPool::new(config.max_workers)?,
        })
    }

    pub async fn run(&self, question: &str) -> OrchestrationResult {
        self.callback
            .on_phase_change(question, ResearchPhase::Decomposing);
        let problems = match QuestionDecomposer::new(self.oracle.clone())
            .decompose(question)
            .await
        {
            Ok(decomposition) => decomposition.problems,
            Err(e) => {
                warn!(error = %e, "Top-level decomposition failed, researching the question as a whole");
                vec![Problem::new(0, question.trim())]
            }
        };
        info!(sub_agents = problems.len(), "Launching sub-agents");

        self.callback
            .on_phase_change(question, ResearchPhase::Researching);
        let submitted = problems.clone();
        let pipeline = self.pipeline.clone();
        let outcomes = self
            .pool
            .run(problems, move |problem: Problem| {
                let pipeline = pipeline.clone();
                async move { Ok(pipeline.run(&problem.text).await) }
            })
            .await;

        let mut sub_results = Vec::with_capacity(submitted.len());
        for (problem, outcome) in submitted.iter().zip(outcomes) {
            let result = outcome.unwrap_or_else(|e| {
                warn!(sub_agent = problem.index, error = %e, "Sub-agent crashed");
                AgentResult::failed(&problem.text, self.pipeline.configured_task_type(), e)
            });
            self.callback.on_sub_agent_complete(problem.index, &result);
            sub_results.push(result);
        }

        let failed_sub_agents: Vec<usize> = sub_results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_failed())
            .map(|(i, _)| i)
            .collect();
        let direct_research_sub_agents: Vec<usize> = sub_results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_failed() && !r.confidence.is_hypothesis_verified())
            .map(|(i, _)| i)
            .collect();
        let aggregate_confidence = mean_confidence(sub_results.iter().map(|r| r.confidence_score));

        self.callback
            .on_phase_change(question, ResearchPhase::Aggregating);
        let sub_answers = render_sub_answers(&sub_results);
        let (final_answer, aggregation_error) = match self
            .oracle
            .ask(OracleCall::Aggregate, &prompts::aggregate(question, &sub_answers))
            .await
        {
            Ok(text) => (text.trim().to_string(), None),
            Err(e) => {
                warn!(error = %e, "Aggregation failed, returning concatenated sub-answers");
                (sub_answers, Some(e.to_string()))
            }
        };

        self.callback.on_phase_change(question, ResearchPhase::Complete);
        info!(
            sub_agents = sub_results.len(),
            failed = failed_sub_agents.len(),
            direct_research = direct_research_sub_agents.len(),
            aggregate_confidence,
            "Orchestration complete"
        );
        OrchestrationResult {
            original_question: question.to_string(),
            sub_results,
            aggregate_confidence,
            final_answer,
            failed_sub_agents,
            direct_research_sub_agents,
            aggregation_error,
            usage: self.oracle.total_usage(),
        }
    }
}

/// Sub-answers in order, failed ones flagged.
fn render_sub_answers(results: &[AgentResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| match r.error() {
            Some(error) => format!("### Sub-problem {}: {}\nFAILED: {error}", i + 1, r.question),
            None => format!(
                "### Sub-problem {}: {}\n{}\n(confidence: {})",
                i + 1,
                r.question,
                r.final_answer,
                r.confidence
            ),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedLlmProvider;
    use crate::research::session::NoOpResearchCallback;
    use crate::tools::ToolRegistry;

    fn orchestrator(provider: ScriptedLlmProvider) -> Orchestrator {
        let config = ResearchConfig {
            task_type: crate::config::TaskType::Simple,
            ..Default::default()
        };
        let oracle = Arc::new(ReasoningOracle::new(Arc::new(provider)));
        let callback: Arc<dyn ResearchCallback> = Arc::new(NoOpResearchCallback);
        let pipeline = ResearchPipeline::new(
            oracle.clone(),
            Arc::new(ToolRegistry::new()),
            Arc::new(config.clone()),
            callback.clone(),
        )
        .unwrap();
        Orchestrator::new(oracle, pipeline, &config, callback).unwrap()
    }

    #[tokio::test]
    async fn test_aggregation_failure_falls_back_to_concatenation() {
        let provider = ScriptedLlmProvider::new("test")
            .with_queued(OracleCall::Decompose, "1. first part\n2. second part")
            .with_default(OracleCall::Decompose, "{}")
            .with_default(OracleCall::SummarizeResearch, "s")
            .with_default(OracleCall::Synthesize, "o")
            .with_default(OracleCall::FinalAnswer, "sub answer");
        let result = orchestrator(provider).run("q").await;

        assert_eq!(result.sub_results.len(), 2);
        assert!(result.failed_sub_agents.is_empty());
        assert_eq!(result.direct_research_sub_agents, vec![0, 1]);
        assert!(result.aggregation_error.is_some());
        assert!(result.final_answer.contains("### Sub-problem 1: first part\nsub answer"));
        assert!(result.final_answer.contains("### Sub-problem 2: second part"));
        assert_eq!(result.aggregate_confidence, 1.0);
    }

    #[tokio::test]
    async fn test_decomposition_failure_researches_whole_question() {
        let provider = ScriptedLlmProvider::new("test")
            .with_default(OracleCall::Aggregate, "final");
        let result = orchestrator(provider).run("  What is Rust?  ").await;

        assert_eq!(result.sub_results.len(), 1);
        assert_eq!(result.sub_results[0].question, "What is Rust?");
        assert_eq!(result.failed_sub_agents, vec![0]);
        assert!(result.direct_research_sub_agents.is_empty());
        assert_eq!(result.aggregate_confidence, 0.0);
        assert_eq!(result.final_answer, "final");
    }

    #[test]
    fn test_render_sub_answers_flags_failures() {
        let failed = AgentResult::failed("b", crate::config::TaskType::Simple, "boom");
        let rendered = render_sub_answers(&[failed]);
        assert_eq!(rendered, "### Sub-problem 1: b\nFAILED: boom");
    }
}
