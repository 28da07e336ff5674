//! Synthesis: merges per-problem results into one ordered research context.

use super::problem::TaskResult;
use super::prompts;
use crate::oracle::ReasoningOracle;
use crate::types::OracleCall;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Structural summary of a set of task results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchOverview {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// One line per problem, in problem order.
    pub digests: Vec<String>,
}

/// All per-problem results, ordered by problem index. Failed problems are
/// kept as entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedContext {
    pub entries: Vec<TaskResult>,
    pub overview: ResearchOverview,
    /// Oracle-written narrative; absent if the call failed or was skipped.
    pub narrative: Option<String>,
}

impl SynthesizedContext {
    /// Fraction of entries that succeeded; 0.0 with no entries.
    pub fn success_ratio(&self) -> f64 {
        if self.overview.total == 0 {
            0.0
        } else {
            self.overview.succeeded as f64 / self.overview.total as f64
        }
    }

    /// Text form used in downstream prompts.
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} problems researched ({} succeeded, {} failed)\n",
            self.overview.total, self.overview.succeeded, self.overview.failed
        );
        for entry in &self.entries {
            out.push_str(&format!(
                "\n## Problem {}: {}\n",
                entry.problem_index, entry.problem_text
            ));
            match &entry.error {
                Some(error) => out.push_str(&format!("FAILED: {error}\n")),
                None => out.push_str(&format!("{}\n", entry.narrative_summary)),
            }
        }
        if let Some(narrative) = &self.narrative {
            out.push_str(&format!("\n## Overview\n{narrative}\n"));
        }
        out
    }
}

/// Builds [`SynthesizedContext`] values.
pub struct Synthesizer;

impl Synthesizer {
    /// Deterministic merge: sort by problem index and compute the overview.
    pub fn merge(mut results: Vec<TaskResult>) -> SynthesizedContext {
        results.sort_by_key(|r| r.problem_index);
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let overview = ResearchOverview {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            digests: results.iter().map(TaskResult::digest).collect(),
        };
        SynthesizedContext {
            entries: results,
            overview,
            narrative: None,
        }
    }

    /// Merge, then ask the oracle for a narrative. A failed narrative call only
    /// leaves `narrative` empty.
    pub async fn synthesize(oracle: &ReasoningOracle, results: Vec<TaskResult>) -> SynthesizedContext {
        let mut context = Self::merge(results);
        if context.overview.succeeded == 0 {
            debug!("No successful results, skipping narrative synthesis");
            return context;
        }
        match oracle
            .ask(OracleCall::Synthesize, &prompts::synthesize(&context.render()))
            .await
        {
            Ok(text) if !text.trim().is_empty() => context.narrative = Some(text.trim().to_string()),
            Ok(_) => warn!("Synthesis narrative was empty"),
            Err(e) => warn!(error = %e, "Synthesis narrative failed, continuing without it"),
        }
        context
    }
}
