//! Hypothesis loop: the generate → verify → decide state machine.
//!
//! The oracle decides when to stop, but the loop never runs more than
//! `max_iterations` generate/verify cycles: once the cap is reached DECIDE
//! finishes without consulting the oracle. Oracle failures end the loop
//! with whatever the experience pool already holds.

use super::hypothesis::{ExperiencePool, Hypothesis};
use super::parsing::{parse_decision, parse_hypotheses, parse_verdict};
use super::prompts;
use super::session::ResearchCallback;
use super::synthesis::SynthesizedContext;
use crate::config::ResearchConfig;
use crate::error::LlmError;
use crate::oracle::ReasoningOracle;
use crate::tools::ToolRegistry;
use crate::types::OracleCall;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Generate,
    Verify,
    Decide,
    Done,
}

/// The oracle's answer at DECIDE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopDecision {
    Continue,
    Finish,
}

/// Why the loop reached DONE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LoopTermination {
    OracleFinished,
    IterationCap,
    GenerateFailed { error: String },
    DecideFailed { error: String },
}

/// Everything a finished loop produced, including rejected hypotheses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopOutcome {
    /// Completed generate/verify cycles.
    pub iterations: usize,
    pub termination: LoopTermination,
    pub hypotheses: Vec<Hypothesis>,
    pub experience_pool: ExperiencePool,
    /// Every state entered, in order, ending with `Done`.
    pub trace: Vec<LoopState>,
}

pub struct HypothesisLoop {
    oracle: Arc<ReasoningOracle>,
    tools: Arc<ToolRegistry>,
    callback: Arc<dyn ResearchCallback>,
    max_iterations: usize,
    max_hypotheses: usize,
    acceptance_threshold: f64,
}

impl HypothesisLoop {
    pub fn new(
        oracle: Arc<ReasoningOracle>,
        tools: Arc<ToolRegistry>,
        callback: Arc<dyn ResearchCallback>,
        config: &ResearchConfig,
    ) -> Self {
        Self {
            oracle,
            tools,
            callback,
            max_iterations: config.max_iterations,
            max_hypotheses: config.max_hypotheses_per_iteration,
            acceptance_threshold: config.acceptance_threshold,
        }
    }

    /// Run the loop to DONE, starting from GENERATE with an empty pool.
    pub async fn run(&self, question: &str, context: &SynthesizedContext) -> LoopOutcome {
        let rendered_context = context.render();
        let mut hypotheses: Vec<Hypothesis> = Vec::new();
        let mut pool = ExperiencePool::new();
        let mut iteration = 1;
        let mut completed = 0;
        let mut termination = LoopTermination::IterationCap;
        let mut trace = Vec::new();
        let mut state = LoopState::Generate;

        loop {
            trace.push(state);
            state = match state {
                LoopState::Generate => {
                    self.callback.on_iteration(iteration, self.max_iterations);
                    match self
                        .generate(question, &rendered_context, &pool, &hypotheses, iteration)
                        .await
                    {
                        Ok(statements) => {
                            info!(iteration, proposed = statements.len(), "Hypotheses generated");
                            for statement in statements {
                                let id = hypotheses.len() + 1;
                                hypotheses.push(Hypothesis::new(id, statement, iteration));
                            }
                            LoopState::Verify
                        }
                        Err(e) => {
                            warn!(iteration, error = %e, "Hypothesis generation failed, ending loop");
                            termination = LoopTermination::GenerateFailed {
                                error: e.to_string(),
                            };
                            LoopState::Done
                        }
                    }
                }
                LoopState::Verify => {
                    for hypothesis in hypotheses.iter_mut().filter(|h| h.is_proposed()) {
                        self.verify(hypothesis).await;
                        pool.record(hypothesis);
                        self.callback.on_hypothesis_judged(hypothesis);
                    }
                    completed += 1;
                    LoopState::Decide
                }
                LoopState::Decide => match self.decide(question, &pool, &hypotheses, iteration).await {
                    Ok(LoopDecision::Continue) => {
                        iteration += 1;
                        LoopState::Generate
                    }
                    Ok(LoopDecision::Finish) => {
                        termination = if iteration >= self.max_iterations {
                            LoopTermination::IterationCap
                        } else {
                            LoopTermination::OracleFinished
                        };
                        LoopState::Done
                    }
                    Err(e) => {
                        warn!(iteration, error = %e, "Decision failed, finishing");
                        termination = LoopTermination::DecideFailed {
                            error: e.to_string(),
                        };
                        LoopState::Done
                    }
                },
                LoopState::Done => break,
            };
        }

        info!(
            iterations = completed,
            verified = pool.len(),
            termination = ?termination,
            "Hypothesis loop finished"
        );
        LoopOutcome {
            iterations: completed,
            termination,
            hypotheses,
            experience_pool: pool,
            trace,
        }
    }

    async fn generate(
        &self,
        question: &str,
        context: &str,
        pool: &ExperiencePool,
        previous: &[Hypothesis],
        iteration: usize,
    ) -> Result<Vec<String>, LlmError> {
        let previous: Vec<String> = previous.iter().map(|h| h.statement.clone()).collect();
        let response = self
            .oracle
            .ask(
                OracleCall::GenerateHypotheses,
                &prompts::generate_hypotheses(
                    question,
                    context,
                    &pool.render(),
                    &previous,
                    iteration,
                    self.max_hypotheses,
                ),
            )
            .await?;
        Ok(parse_hypotheses(&response, self.max_hypotheses))
    }

    /// Gather evidence for one hypothesis and judge it. A failed judgement
    /// rejects the hypothesis with zero confidence.
    async fn verify(&self, hypothesis: &mut Hypothesis) {
        let evidence = self.tools.invoke_all(&hypothesis.statement).await;
        let verdict = match self
            .oracle
            .ask(
                OracleCall::Judge,
                &prompts::judge(&hypothesis.statement, &evidence),
            )
            .await
        {
            Ok(text) => parse_verdict(&text, self.acceptance_threshold),
            Err(e) => Err(e),
        };

        match verdict {
            Ok(verdict) if verdict.verified => {
                debug!(id = hypothesis.id, confidence = verdict.confidence, "Hypothesis verified");
                hypothesis.mark_verified(evidence, verdict.confidence);
            }
            Ok(verdict) => {
                debug!(id = hypothesis.id, confidence = verdict.confidence, "Hypothesis rejected");
                let reason = verdict
                    .reasoning
                    .unwrap_or_else(|| "judged unsupported by the evidence".to_string());
                hypothesis.mark_rejected(evidence, verdict.confidence, reason);
            }
            Err(e) => {
                warn!(id = hypothesis.id, error = %e, "Judgement failed, rejecting hypothesis");
                hypothesis.mark_rejected(evidence, 0.0, format!("judgement failed: {e}"));
            }
        }
    }

    async fn decide(
        &self,
        question: &str,
        pool: &ExperiencePool,
        hypotheses: &[Hypothesis],
        iteration: usize,
    ) -> Result<LoopDecision, LlmError> {
        if iteration >= self.max_iterations {
            debug!(iteration, max_iterations = self.max_iterations, "Iteration cap reached");
            return Ok(LoopDecision::Finish);
        }
        let summary = if hypotheses.is_empty() {
            "(none)".to_string()
        } else {
            hypotheses
                .iter()
                .map(Hypothesis::summary_line)
                .collect::<Vec<_>>()
                .join("\n")
        };
        let response = self
            .oracle
            .ask(
                OracleCall::Decide,
                &prompts::decide(
                    question,
                    &pool.render(),
                    &summary,
                    iteration,
                    self.max_iterations,
                ),
            )
            .await?;
        parse_decision(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedLlmProvider;
    use crate::research::hypothesis::HypothesisStatus;
    use crate::research::session::NoOpResearchCallback;
    use crate::research::synthesis::Synthesizer;
    use crate::tools::StaticTool;
    use pretty_assertions::assert_eq;

    fn build(provider: ScriptedLlmProvider, max_iterations: usize) -> (HypothesisLoop, Arc<ReasoningOracle>) {
        let oracle = Arc::new(ReasoningOracle::new(Arc::new(provider)));
        let mut tools = ToolRegistry::new();
        tools
            .register(Arc::new(StaticTool::new("web_search", "supporting data")))
            .unwrap();
        let config = ResearchConfig {
            max_iterations,
            ..Default::default()
        };
        let hypothesis_loop = HypothesisLoop::new(
            oracle.clone(),
            Arc::new(tools),
            Arc::new(NoOpResearchCallback),
            &config,
        );
        (hypothesis_loop, oracle)
    }

    fn empty_context() -> SynthesizedContext {
        Synthesizer::merge(Vec::new())
    }

    #[tokio::test]
    async fn test_always_continue_stops_at_cap() {
        let provider = ScriptedLlmProvider::new("test")
            .with_default(OracleCall::GenerateHypotheses, "1. H")
            .with_default(OracleCall::Judge, r#"{"verdict": "verified", "confidence": 0.9}"#)
            .with_default(OracleCall::Decide, "CONTINUE");
        let (hypothesis_loop, oracle) = build(provider, 2);

        let outcome = hypothesis_loop.run("q", &empty_context()).await;
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.termination, LoopTermination::IterationCap);
        assert_eq!(
            outcome.trace,
            vec![
                LoopState::Generate,
                LoopState::Verify,
                LoopState::Decide,
                LoopState::Generate,
                LoopState::Verify,
                LoopState::Decide,
                LoopState::Done,
            ]
        );
        assert_eq!(oracle.call_count(OracleCall::GenerateHypotheses), 2);
        // the capped DECIDE never reaches the oracle
        assert_eq!(oracle.call_count(OracleCall::Decide), 1);
        let created: Vec<_> = outcome.hypotheses.iter().map(|h| h.iteration_created).collect();
        assert_eq!(created, vec![1, 2]);
        assert_eq!(outcome.experience_pool.len(), 2);
    }

    #[tokio::test]
    async fn test_oracle_finish_ends_early() {
        let provider = ScriptedLlmProvider::new("test")
            .with_default(
                OracleCall::GenerateHypotheses,
                r#"{"hypotheses": [{"hypothesis": "A"}, {"hypothesis": "B"}]}"#,
            )
            .with_queued(OracleCall::Judge, "confidence: 0.8")
            .with_queued(OracleCall::Judge, r#"{"verdict": "rejected", "confidence": 0.2, "reasoning": "contradicted"}"#)
            .with_default(OracleCall::Decide, "FINISH");
        let (hypothesis_loop, _) = build(provider, 5);

        let outcome = hypothesis_loop.run("q", &empty_context()).await;
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.termination, LoopTermination::OracleFinished);
        assert_eq!(outcome.hypotheses[0].status, HypothesisStatus::Verified);
        assert_eq!(outcome.hypotheses[1].status, HypothesisStatus::Rejected);
        assert_eq!(outcome.hypotheses[1].rejection_reason.as_deref(), Some("contradicted"));
        assert_eq!(outcome.hypotheses[0].verification_evidence.len(), 1);
        assert_eq!(outcome.experience_pool.len(), 1);
        assert!((outcome.experience_pool.mean_confidence() - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_generate_failure_keeps_pool() {
        let provider = ScriptedLlmProvider::new("test")
            .with_queued(OracleCall::GenerateHypotheses, "1. First")
            .with_default(OracleCall::Judge, "confidence 0.7")
            .with_default(OracleCall::Decide, "CONTINUE");
        let (hypothesis_loop, _) = build(provider, 3);

        let outcome = hypothesis_loop.run("q", &empty_context()).await;
        assert_eq!(outcome.iterations, 1);
        assert!(matches!(outcome.termination, LoopTermination::GenerateFailed { .. }));
        assert_eq!(outcome.experience_pool.len(), 1);
        assert_eq!(outcome.trace.last(), Some(&LoopState::Done));
    }

    #[tokio::test]
    async fn test_unparseable_decision_finishes() {
        let provider = ScriptedLlmProvider::new("test")
            .with_default(OracleCall::GenerateHypotheses, "1. H")
            .with_default(OracleCall::Judge, "confidence 0.7")
            .with_default(OracleCall::Decide, "hmm, hard to say");
        let (hypothesis_loop, oracle) = build(provider, 3);

        let outcome = hypothesis_loop.run("q", &empty_context()).await;
        assert_eq!(outcome.iterations, 1);
        assert!(matches!(outcome.termination, LoopTermination::DecideFailed { .. }));
        assert_eq!(oracle.call_count(OracleCall::Decide), 1);
    }

    #[tokio::test]
    async fn test_judge_failure_rejects_hypothesis() {
        let provider = ScriptedLlmProvider::new("test")
            .with_default(OracleCall::GenerateHypotheses, "1. H")
            .with_default(OracleCall::Judge, "   ");
        let (hypothesis_loop, _) = build(provider, 1);

        let outcome = hypothesis_loop.run("q", &empty_context()).await;
        let h = &outcome.hypotheses[0];
        assert_eq!(h.status, HypothesisStatus::Rejected);
        assert_eq!(h.confidence, 0.0);
        assert!(h.rejection_reason.as_deref().unwrap().starts_with("judgement failed"));
        assert!(outcome.experience_pool.is_empty());
        assert_eq!(outcome.experience_pool.mean_confidence(), 0.0);
    }

    #[tokio::test]
    async fn test_no_hypotheses_still_decides() {
        let provider = ScriptedLlmProvider::new("test")
            .with_default(OracleCall::GenerateHypotheses, "")
            .with_default(OracleCall::Decide, "FINISH");
        let (hypothesis_loop, oracle) = build(provider, 2);

        let outcome = hypothesis_loop.run("q", &empty_context()).await;
        assert!(outcome.hypotheses.is_empty());
        assert_eq!(outcome.termination, LoopTermination::OracleFinished);
        assert_eq!(oracle.call_count(OracleCall::Judge), 0);
    }
}
