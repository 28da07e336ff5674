//! Problems and per-problem research results.

use crate::tools::ToolInvocation;
use serde::{Deserialize, Serialize};

/// One decomposed, independently researchable sub-question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub index: usize,
    pub text: String,
}

impl Problem {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Index the given texts in order.
    pub fn from_texts<I, S>(texts: I) -> Vec<Problem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Problem::new(index, text))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failed,
}

/// The outcome of researching one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub problem_index: usize,
    pub problem_text: String,
    pub evidence: Vec<ToolInvocation>,
    pub narrative_summary: String,
    pub status: TaskStatus,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(
        problem: &Problem,
        evidence: Vec<ToolInvocation>,
        narrative_summary: impl Into<String>,
    ) -> Self {
        Self {
            problem_index: problem.index,
            problem_text: problem.text.clone(),
            evidence,
            narrative_summary: narrative_summary.into(),
            status: TaskStatus::Success,
            error: None,
        }
    }

    /// A task that produced nothing. Evidence is always empty.
    pub fn failed(problem: &Problem, error: impl std::fmt::Display) -> Self {
        Self {
            problem_index: problem.index,
            problem_text: problem.text.clone(),
            evidence: Vec::new(),
            narrative_summary: String::new(),
            status: TaskStatus::Failed,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// Number of evidence items whose tool call succeeded.
    pub fn successful_evidence(&self) -> usize {
        self.evidence.iter().filter(|e| e.success).count()
    }

    /// One-line digest for overviews.
    pub fn digest(&self) -> String {
        match self.status {
            TaskStatus::Success => format!(
                "[{}] ok: {} ({}/{} tool calls succeeded)",
                self.problem_index,
                self.problem_text,
                self.successful_evidence(),
                self.evidence.len()
            ),
            TaskStatus::Failed => format!(
                "[{}] failed: {} ({})",
                self.problem_index,
                self.problem_text,
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problems_from_texts_are_indexed_in_order() {
        let problems = Problem::from_texts(["a", "b", "c"]);
        let indices: Vec<_> = problems.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(problems[2].text, "c");
    }

    #[test]
    fn test_failed_result_has_no_evidence() {
        let result = TaskResult::failed(&Problem::new(1, "Why?"), "oracle unreachable");
        assert!(!result.is_success());
        assert!(result.evidence.is_empty());
        assert_eq!(result.error.as_deref(), Some("oracle unreachable"));
        assert_eq!(result.digest(), "[1] failed: Why? (oracle unreachable)");
    }

    #[test]
    fn test_success_digest_counts_evidence() {
        let evidence = vec![
            ToolInvocation::succeeded("web", "q", "hit".into()),
            ToolInvocation {
                tool_name: "arxiv".into(),
                query: "q".into(),
                result_text: "down".into(),
                success: false,
            },
        ];
        let result = TaskResult::success(&Problem::new(0, "What?"), evidence, "summary");
        assert_eq!(result.digest(), "[0] ok: What? (1/2 tool calls succeeded)");
    }
}
