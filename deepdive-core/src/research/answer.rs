//! Final answer synthesis and the two kinds of answer confidence.

use super::hypothesis::ExperiencePool;
use super::prompts;
use super::synthesis::SynthesizedContext;
use crate::error::LlmError;
use crate::oracle::ReasoningOracle;
use crate::types::OracleCall;
use serde::{Deserialize, Serialize};

/// How much an answer can be trusted, and on what basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerConfidence {
    /// Mean confidence of the verified hypotheses (0.0 when none were verified).
    HypothesisVerified { score: f64, verified: usize },
    /// Derived from direct research, not hypothesis-verified. `coverage` is
    /// the fraction of research tasks that succeeded.
    DirectResearch { coverage: f64 },
}

impl AnswerConfidence {
    pub fn from_pool(pool: &ExperiencePool) -> Self {
        AnswerConfidence::HypothesisVerified {
            score: pool.mean_confidence(),
            verified: pool.len(),
        }
    }

    pub fn from_research(context: &SynthesizedContext) -> Self {
        AnswerConfidence::DirectResearch {
            coverage: context.success_ratio(),
        }
    }

    /// The number used when confidences are averaged.
    pub fn value(&self) -> f64 {
        match self {
            AnswerConfidence::HypothesisVerified { score, .. } => *score,
            AnswerConfidence::DirectResearch { coverage } => *coverage,
        }
    }

    pub fn is_hypothesis_verified(&self) -> bool {
        matches!(self, AnswerConfidence::HypothesisVerified { .. })
    }
}

impl std::fmt::Display for AnswerConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerConfidence::HypothesisVerified { score, verified } => {
                write!(f, "{score:.2} from {verified} verified hypotheses")
            }
            AnswerConfidence::DirectResearch { coverage } => write!(
                f,
                "direct research, not hypothesis-verified ({:.0}% of tasks succeeded)",
                coverage * 100.0
            ),
        }
    }
}

/// Produces one narrative answer from the research and, if the hypothesis
/// loop ran, its experience pool.
pub struct FinalAnswerSynthesizer;

impl FinalAnswerSynthesizer {
    pub async fn answer(
        oracle: &ReasoningOracle,
        question: &str,
        context: &SynthesizedContext,
        pool: Option<&ExperiencePool>,
    ) -> Result<(String, AnswerConfidence), LlmError> {
        let experience = pool.filter(|p| !p.is_empty()).map(ExperiencePool::render);
        let text = oracle
            .ask(
                OracleCall::FinalAnswer,
                &prompts::final_answer(question, &context.render(), experience.as_deref()),
            )
            .await?;
        let confidence = match pool {
            Some(pool) => AnswerConfidence::from_pool(pool),
            None => AnswerConfidence::from_research(context),
        };
        Ok((text.trim().to_string(), confidence))
    }
}
