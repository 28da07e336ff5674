//! Research engine: iterative, parallel research pipeline.
//!
//! A research pipeline runs in five phases:
//! 1. **Decompose**: Split the question into independently researchable problems
//! 2. **Research**: Resolve every problem concurrently on a bounded worker pool
//! 3. **Synthesize**: Merge per-problem results in problem order
//! 4. **Hypothesize**: Generate, verify and decide in a loop (complex questions only)
//! 5. **Answer**: Produce the final answer with its confidence
//!
//! The orchestrator reuses the same pipeline as its per-sub-problem unit and
//! aggregates the sub-agent answers into one.

pub mod answer;
pub mod classifier;
pub mod decomposition;
pub mod dispatcher;
pub mod engine;
pub mod executor;
pub mod hypothesis;
pub mod hypothesis_loop;
pub mod orchestrator;
pub mod parsing;
pub mod pipeline;
pub mod problem;
pub mod prompts;
pub mod session;
pub mod synthesis;

pub use answer::{AnswerConfidence, FinalAnswerSynthesizer};
pub use decomposition::{Decomposition, QuestionDecomposer};
pub use dispatcher::{Dispatcher, WorkerPool};
pub use engine::{ResearchEngine, ResearchOutcome};
pub use executor::{ResearchTaskExecutor, TaskExecutor};
pub use hypothesis::{ExperiencePool, ExperiencePoolEntry, Hypothesis, HypothesisStatus};
pub use hypothesis_loop::{HypothesisLoop, LoopDecision, LoopOutcome, LoopState, LoopTermination};
pub use orchestrator::{OrchestrationResult, Orchestrator};
pub use pipeline::{AgentResult, AgentStatus, ResearchPipeline};
pub use problem::{Problem, TaskResult, TaskStatus};
pub use session::{NoOpResearchCallback, ResearchCallback, ResearchPhase};
pub use synthesis::{ResearchOverview, SynthesizedContext, Synthesizer};
