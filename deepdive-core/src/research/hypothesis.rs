//! Hypotheses and the experience pool of verified knowledge.

use crate::tools::ToolInvocation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypothesisStatus {
    Proposed,
    Verified,
    Rejected,
}

/// A falsifiable statement proposed from evidence.
///
/// Only the verify step changes a hypothesis, and only once: a `Proposed`
/// hypothesis becomes `Verified` or `Rejected`. Rejected hypotheses are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: usize,
    pub statement: String,
    pub iteration_created: usize,
    pub status: HypothesisStatus,
    pub verification_evidence: Vec<ToolInvocation>,
    pub confidence: f64,
    pub rejection_reason: Option<String>,
}

impl Hypothesis {
    pub fn new(id: usize, statement: impl Into<String>, iteration_created: usize) -> Self {
        Self {
            id,
            statement: statement.into(),
            iteration_created,
            status: HypothesisStatus::Proposed,
            verification_evidence: Vec::new(),
            confidence: 0.0,
            rejection_reason: None,
        }
    }

    pub fn is_proposed(&self) -> bool {
        self.status == HypothesisStatus::Proposed
    }

    pub fn is_verified(&self) -> bool {
        self.status == HypothesisStatus::Verified
    }

    pub fn mark_verified(&mut self, evidence: Vec<ToolInvocation>, confidence: f64) {
        self.status = HypothesisStatus::Verified;
        self.verification_evidence = evidence;
        self.confidence = confidence.clamp(0.0, 1.0);
    }

    pub fn mark_rejected(
        &mut self,
        evidence: Vec<ToolInvocation>,
        confidence: f64,
        reason: impl Into<String>,
    ) {
        self.status = HypothesisStatus::Rejected;
        self.verification_evidence = evidence;
        self.confidence = confidence.clamp(0.0, 1.0);
        self.rejection_reason = Some(reason.into());
    }

    /// `[status, confidence] statement` line for prompts.
    pub fn summary_line(&self) -> String {
        let status = match self.status {
            HypothesisStatus::Proposed => "proposed",
            HypothesisStatus::Verified => "verified",
            HypothesisStatus::Rejected => "rejected",
        };
        format!("- [{status}, {:.2}] {}", self.confidence, self.statement)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperiencePoolEntry {
    pub hypothesis_id: usize,
    pub statement: String,
    pub confidence: f64,
}

/// Append-only store of verified knowledge for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperiencePool {
    entries: Vec<ExperiencePoolEntry>,
}

impl ExperiencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a verified hypothesis. Anything else is ignored.
    pub fn record(&mut self, hypothesis: &Hypothesis) -> bool {
        if !hypothesis.is_verified() {
            return false;
        }
        self.entries.push(ExperiencePoolEntry {
            hypothesis_id: hypothesis.id,
            statement: hypothesis.statement.clone(),
            confidence: hypothesis.confidence,
        });
        true
    }

    pub fn entries(&self) -> &[ExperiencePoolEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ExperiencePoolEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mean confidence of all entries, in [0, 1]. An empty pool scores 0.0.
    pub fn mean_confidence(&self) -> f64 {
        mean_confidence(self.entries.iter().map(|e| e.confidence))
    }

    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "(none yet)".to_string();
        }
        self.entries
            .iter()
            .map(|e| format!("- {} (confidence {:.2})", e.statement, e.confidence))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Mean of confidence values clamped to [0, 1]; non-finite values count as
/// 0.0 and an empty input yields 0.0.
pub fn mean_confidence(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values.into_iter().fold((0.0, 0usize), |(sum, count), v| {
        let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        (sum + v, count + 1)
    });
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).clamp(0.0, 1.0)
    }
}
