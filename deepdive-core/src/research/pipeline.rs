//! Research pipeline: one complete decompose → research → synthesize →
//! hypothesize → answer run.
//!
//! Used directly for single-agent research and as the orchestrator's
//! per-sub-problem unit. A run never returns an error: failures are recorded
//! in [`AgentResult::status`] next to whatever partial results exist.

use super::answer::{AnswerConfidence, FinalAnswerSynthesizer};
use super::classifier::classify_question;
use super::decomposition::QuestionDecomposer;
use super::dispatcher::{Dispatcher, WorkerPool};
use super::executor::ResearchTaskExecutor;
use super::hypothesis::{ExperiencePoolEntry, Hypothesis};
use super::hypothesis_loop::{HypothesisLoop, LoopTermination};
use super::session::{ResearchCallback, ResearchPhase};
use super::synthesis::{SynthesizedContext, Synthesizer};
use crate::config::{ResearchConfig, TaskType};
use crate::error::ConfigError;
use crate::oracle::ReasoningOracle;
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AgentStatus {
    Completed,
    Failed { error: String },
}

/// Terminal output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub question: String,
    /// The resolved type; never `Auto`.
    pub task_type: TaskType,
    pub status: AgentStatus,
    pub final_answer: String,
    pub confidence: AnswerConfidence,
    /// Numeric confidence used for aggregation; 0.0 for failed runs.
    pub confidence_score: f64,
    pub synthesized_context: SynthesizedContext,
    pub hypotheses: Vec<Hypothesis>,
    pub experience_pool: Vec<ExperiencePoolEntry>,
    /// Completed hypothesis loop cycles; 0 when the loop was skipped.
    pub iterations: usize,
    pub loop_termination: Option<LoopTermination>,
}

impl AgentResult {
    /// A run that produced nothing beyond its error.
    pub fn failed(question: &str, task_type: TaskType, error: impl std::fmt::Display) -> Self {
        Self {
            question: question.to_string(),
            task_type: resolve_task_type(task_type, None, question),
            status: AgentStatus::Failed {
                error: error.to_string(),
            },
            final_answer: String::new(),
            confidence: AnswerConfidence::DirectResearch { coverage: 0.0 },
            confidence_score: 0.0,
            synthesized_context: Synthesizer::merge(Vec::new()),
            hypotheses: Vec::new(),
            experience_pool: Vec::new(),
            iterations: 0,
            loop_termination: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, AgentStatus::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            AgentStatus::Failed { error } => Some(error),
            AgentStatus::Completed => None,
        }
    }
}

/// Turn a configured task type into `Simple` or `Complex`. An oracle hint
/// beats the keyword heuristic.
pub fn resolve_task_type(configured: TaskType, hint: Option<TaskType>, question: &str) -> TaskType {
    match configured {
        TaskType::Auto => hint
            .filter(|t| *t != TaskType::Auto)
            .unwrap_or_else(|| classify_question(question)),
        fixed => fixed,
    }
}

/// A single research agent. Cheap to clone; all state is per run.
#[derive(Clone)]
pub struct ResearchPipeline {
    oracle: Arc<ReasoningOracle>,
    tools: Arc<ToolRegistry>,
    config: Arc<ResearchConfig>,
    callback: Arc<dyn ResearchCallback>,
    pool: WorkerPool,
}

impl ResearchPipeline {
    pub fn new(
        oracle: Arc<ReasoningOracle>,
        tools: Arc<ToolRegistry>,
        config: Arc<ResearchConfig>,
        callback: Arc<dyn ResearchCallback>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = WorkerPool::new(config.max_workers)?;
        Ok(Self {
            oracle,
            tools,
            config,
            callback,
            pool,
        })
    }

    /// The task type every run of this pipeline starts from.
    pub fn configured_task_type(&self) -> TaskType {
        self.config.task_type
    }

    pub async fn run(&self, question: &str) -> AgentResult {
        self.callback
            .on_phase_change(question, ResearchPhase::Decomposing);
        let decomposition = match QuestionDecomposer::new(self.oracle.clone())
            .decompose(question)
            .await
        {
            Ok(decomposition) => decomposition,
            Err(e) => {
                warn!(error = %e, "Decomposition failed");
                return AgentResult::failed(question, self.config.task_type, e);
            }
        };
        let task_type = resolve_task_type(self.config.task_type, decomposition.task_type, question);
        info!(
            problems = decomposition.problems.len(),
            task_type = %task_type,
            "Research pipeline started"
        );

        self.callback
            .on_phase_change(question, ResearchPhase::Researching);
        let executor = Arc::new(ResearchTaskExecutor::new(
            self.oracle.clone(),
            self.tools.clone(),
        ));
        let results = Dispatcher::new(self.pool, executor, self.callback.clone())
            .dispatch(decomposition.problems)
            .await;

        self.callback
            .on_phase_change(question, ResearchPhase::Synthesizing);
        let context = Synthesizer::synthesize(&self.oracle, results).await;

        let outcome = if task_type == TaskType::Complex {
            self.callback
                .on_phase_change(question, ResearchPhase::Hypothesizing);
            let hypothesis_loop = HypothesisLoop::new(
                self.oracle.clone(),
                self.tools.clone(),
                self.callback.clone(),
                &self.config,
            );
            Some(hypothesis_loop.run(question, &context).await)
        } else {
            None
        };

        self.callback
            .on_phase_change(question, ResearchPhase::Answering);
        let answer = FinalAnswerSynthesizer::answer(
            &self.oracle,
            question,
            &context,
            outcome.as_ref().map(|o| &o.experience_pool),
        )
        .await;

        let (status, final_answer, confidence, confidence_score) = match answer {
            Ok((text, confidence)) => {
                let score = confidence.value();
                (AgentStatus::Completed, text, confidence, score)
            }
            Err(e) => {
                warn!(error = %e, "Final answer failed");
                let confidence = match &outcome {
                    Some(o) => AnswerConfidence::from_pool(&o.experience_pool),
                    None => AnswerConfidence::from_research(&context),
                };
                (
                    AgentStatus::Failed {
                        error: e.to_string(),
                    },
                    String::new(),
                    confidence,
                    0.0,
                )
            }
        };

        self.callback.on_phase_change(question, ResearchPhase::Complete);
        let (hypotheses, experience_pool, iterations, loop_termination) = match outcome {
            Some(o) => (
                o.hypotheses,
                o.experience_pool.into_entries(),
                o.iterations,
                Some(o.termination),
            ),
            None => (Vec::new(), Vec::new(), 0, None),
        };
        AgentResult {
            question: question.to_string(),
            task_type,
            status,
            final_answer,
            confidence,
            confidence_score,
            synthesized_context: context,
            hypotheses,
            experience_pool,
            iterations,
            loop_termination,
        }
    }
}
