//! Question decomposition into independently researchable problems.

use super::parsing::parse_decomposition;
use super::problem::Problem;
use super::prompts;
use crate::config::TaskType;
use crate::error::LlmError;
use crate::oracle::ReasoningOracle;
use crate::types::OracleCall;
use std::sync::Arc;
use tracing::debug;

/// The problems a question was split into.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Never empty; indices run `0..len` in order.
    pub problems: Vec<Problem>,
    /// The oracle's simple/complex judgement, if it gave one.
    pub task_type: Option<TaskType>,
}

/// Decomposes a question into problems using the oracle.
pub struct QuestionDecomposer {
    oracle: Arc<ReasoningOracle>,
}

impl QuestionDecomposer {
    pub fn new(oracle: Arc<ReasoningOracle>) -> Self {
        Self { oracle }
    }

    /// Ask the oracle to split `question`. Only a failed oracle call is an
    /// error; unusable output degrades to the question as the sole problem.
    pub async fn decompose(&self, question: &str) -> Result<Decomposition, LlmError> {
        let response = self
            .oracle
            .ask(OracleCall::Decompose, &prompts::decompose(question))
            .await?;
        let parsed = parse_decomposition(&response, question);
        debug!(
            problems = parsed.problems.len(),
            task_type = ?parsed.task_type,
            "Question decomposed"
        );
        Ok(Decomposition {
            problems: Problem::from_texts(parsed.problems),
            task_type: parsed.task_type,
        })
    }
}
