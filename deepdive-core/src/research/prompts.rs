//! Prompt builders for every oracle call the research engine makes.

use crate::tools::ToolInvocation;

/// Tool output longer than this is cut before it goes into a prompt.
const MAX_EVIDENCE_CHARS: usize = 2_000;

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

/// Render evidence as a numbered block.
pub fn render_evidence(evidence: &[ToolInvocation]) -> String {
    if evidence.is_empty() {
        return "(no evidence gathered)".to_string();
    }
    evidence
        .iter()
        .enumerate()
        .map(|(i, e)| {
            format!(
                "{}. [{}{}] query: {}\n{}",
                i + 1,
                e.tool_name,
                if e.success { "" } else { ", failed" },
                e.query,
                truncate(&e.result_text, MAX_EVIDENCE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn decompose(question: &str) -> String {
    format!(
        r#"Break the question below into specific sub-problems that can each be researched on their own and that together answer it.

Question: {question}

Also judge whether the question is a simple fact lookup ("simple") or needs analysis and hypothesis testing ("complex").

Respond with JSON only:
{{"sub_problems": [{{"id": 1, "problem": "..."}}], "task_type": "simple" | "complex"}}"#
    )
}

pub fn plan_research(problem: &str, tools: &str) -> String {
    format!(
        r#"Plan the research for this problem by choosing tool queries.

Problem: {problem}

Available tools:
{tools}

Respond with JSON only:
{{"analysis": "what information is needed", "queries": [{{"tool": "tool name", "query": "search text"}}]}}"#
    )
}

pub fn summarize_research(problem: &str, evidence: &[ToolInvocation]) -> String {
    format!(
        "Summarize what the evidence below establishes about the problem. \
Note gaps and contradictions; do not invent facts.\n\nProblem: {problem}\n\nEvidence:\n{}",
        render_evidence(evidence)
    )
}

pub fn synthesize(overview: &str) -> String {
    format!(
        "Write a short narrative overview connecting the research results below. \
Point out where results agree, conflict, or are missing.\n\n{overview}"
    )
}

pub fn generate_hypotheses(
    question: &str,
    context: &str,
    experience: &str,
    previous: &[String],
    iteration: usize,
    max_hypotheses: usize,
) -> String {
    let previous = if previous.is_empty() {
        "(none)".to_string()
    } else {
        previous
            .iter()
            .map(|p| format!("- {p}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"Iteration {iteration}. Propose up to {max_hypotheses} new falsifiable hypotheses that would help answer the question.
Each must be specific, testable with the available tools, and grounded in the research.
Do not repeat earlier hypotheses.

Question: {question}

Research:
{context}

Verified knowledge so far:
{experience}

Earlier hypotheses:
{previous}

Respond with JSON only:
{{"hypotheses": [{{"id": 1, "hypothesis": "...", "rationale": "..."}}]}}"#
    )
}

pub fn judge(statement: &str, evidence: &[ToolInvocation]) -> String {
    format!(
        r#"Judge whether the evidence supports the hypothesis. Try to falsify it before accepting it.

Hypothesis: {statement}

Evidence:
{}

Respond with JSON only:
{{"verdict": "verified" | "rejected", "confidence": 0.0-1.0, "reasoning": "..."}}"#,
        render_evidence(evidence)
    )
}

pub fn decide(
    question: &str,
    experience: &str,
    hypotheses_summary: &str,
    iteration: usize,
    max_iterations: usize,
) -> String {
    format!(
        r#"Decide whether another research iteration would materially improve the answer.

Iteration: {iteration} / {max_iterations}
Question: {question}

Hypotheses so far:
{hypotheses_summary}

Verified knowledge:
{experience}

Answer with exactly one word: CONTINUE or FINISH."#
    )
}

pub fn final_answer(question: &str, context: &str, experience: Option<&str>) -> String {
    let experience = experience
        .map(|e| format!("\n\nVerified knowledge:\n{e}"))
        .unwrap_or_default();
    format!(
        "Answer the question directly and completely using the research below. \
State conclusions, not the process that produced them, and acknowledge uncertainty.\n\n\
Question: {question}\n\nResearch:\n{context}{experience}"
    )
}

pub fn aggregate(question: &str, sub_answers: &str) -> String {
    format!(
        "Combine the sub-answers below into one coherent answer to the original question. \
Sub-answers marked FAILED produced no usable result; mention the gap they leave.\n\n\
Question: {question}\n\n{sub_answers}"
    )
}
