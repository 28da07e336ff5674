//! Progress output on stderr while research runs.

use deepdive_core::{
    AgentResult, Hypothesis, HypothesisStatus, ResearchCallback, ResearchPhase, TaskResult,
};

/// Prints one line per research event to stderr, keeping stdout for the answer.
pub struct ProgressPrinter;

impl ProgressPrinter {
    fn task_line(result: &TaskResult) -> String {
        match &result.error {
            Some(error) => format!("  x task {} failed: {}", result.problem_index, error),
            None => format!(
                "  + task {} done ({} evidence)",
                result.problem_index,
                result.successful_evidence()
            ),
        }
    }

    fn hypothesis_line(hypothesis: &Hypothesis) -> String {
        let mark = match hypothesis.status {
            HypothesisStatus::Verified => "verified",
            HypothesisStatus::Rejected => "rejected",
            HypothesisStatus::Proposed => "proposed",
        };
        format!(
            "  ? hypothesis {} {mark} ({:.2}): {}",
            hypothesis.id, hypothesis.confidence, hypothesis.statement
        )
    }
}

impl ResearchCallback for ProgressPrinter {
    fn on_phase_change(&self, question: &str, phase: ResearchPhase) {
        eprintln!("[{phase}] {question}");
    }

    fn on_task_complete(&self, result: &TaskResult) {
        eprintln!("{}", Self::task_line(result));
    }

    fn on_hypothesis_judged(&self, hypothesis: &Hypothesis) {
        eprintln!("{}", Self::hypothesis_line(hypothesis));
    }

    fn on_iteration(&self, iteration: usize, max_iterations: usize) {
        eprintln!("  iteration {iteration}/{max_iterations}");
    }

    fn on_sub_agent_complete(&self, index: usize, result: &AgentResult) {
        match result.error() {
            Some(error) => eprintln!("  x sub-agent {index} failed: {error}"),
            None => eprintln!(
                "  + sub-agent {index} done (confidence {:.2})",
                result.confidence_score
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepdive_core::Problem;

    #[test]
    fn test_task_line() {
        let problem = Problem::new(2, "p");
        let ok = TaskResult::success(&problem, Vec::new(), "s");
        assert_eq!(ProgressPrinter::task_line(&ok), "  + task 2 done (0 evidence)");
        let failed = TaskResult::failed(&problem, "down");
        assert_eq!(ProgressPrinter::task_line(&failed), "  x task 2 failed: down");
    }

    #[test]
    fn test_hypothesis_line() {
        let mut hypothesis = Hypothesis::new(3, "caching helps", 1);
        hypothesis.mark_verified(Vec::new(), 0.75);
        assert_eq!(
            ProgressPrinter::hypothesis_line(&hypothesis),
            "  ? hypothesis 3 verified (0.75): caching helps"
        );
    }
}
