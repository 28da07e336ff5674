//! Research phases and progress callbacks.

use super::hypothesis::Hypothesis;
use super::pipeline::AgentResult;
use super::problem::TaskResult;
use serde::{Deserialize, Serialize};

/// Current phase of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchPhase {
    Decomposing,
    Researching,
    Synthesizing,
    Hypothesizing,
    Answering,
    Aggregating,
    Complete,
}

impl std::fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchPhase::Decomposing => write!(f, "Decomposing"),
            ResearchPhase::Researching => write!(f, "Researching"),
            ResearchPhase::Synthesizing => write!(f, "Synthesizing"),
            ResearchPhase::Hypothesizing => write!(f, "Hypothesizing"),
            ResearchPhase::Answering => write!(f, "Answering"),
            ResearchPhase::Aggregating => write!(f, "Aggregating"),
            ResearchPhase::Complete => write!(f, "Complete"),
        }
    }
}

/// Callback trait for progressive research UI updates.
///
/// Called from worker tasks, so implementations must be cheap and thread-safe.
pub trait ResearchCallback: Send + Sync {
    /// Called when a pipeline (or the orchestrator) enters a new phase.
    fn on_phase_change(&self, question: &str, phase: ResearchPhase);
    /// Called once per problem after the dispatcher has collected all results.
    fn on_task_complete(&self, result: &TaskResult);
    /// Called when a hypothesis is verified or rejected.
    fn on_hypothesis_judged(&self, hypothesis: &Hypothesis);
    /// Called at the start of every hypothesis loop cycle.
    fn on_iteration(&self, iteration: usize, max_iterations: usize);
    /// Called once per sub-agent, in sub-problem order.
    fn on_sub_agent_complete(&self, index: usize, result: &AgentResult);
}

/// No-op callback for testing.
pub struct NoOpResearchCallback;

impl ResearchCallback for NoOpResearchCallback {
    fn on_phase_change(&self, _question: &str, _phase: ResearchPhase) {}
    fn on_task_complete(&self, _result: &TaskResult) {}
    fn on_hypothesis_judged(&self, _hypothesis: &Hypothesis) {}
    fn on_iteration(&self, _iteration: usize, _max_iterations: usize) {}
    fn on_sub_agent_complete(&self, _index: usize, _result: &AgentResult) {}
}
