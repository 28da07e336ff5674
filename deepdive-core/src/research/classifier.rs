//! Keyword heuristic that decides whether a question needs the hypothesis loop.

use crate::config::TaskType;

const COMPLEX_KEYWORDS: &[&str] = &[
    "how should",
    "how can i",
    "best way",
    "architecture",
    "design",
    "compare",
    "vs",
    "advantage",
    "disadvantage",
    "trade-off",
    "analyze",
    "why",
    "solve",
    "problem",
    "challenge",
    "strategy",
    "approach",
    "implement",
    "build",
    "create",
    "optimize",
    "improve",
    "recommend",
    "suggest",
];

const SIMPLE_KEYWORDS: &[&str] = &[
    "what is",
    "what are",
    "how do i",
    "how to",
    "tell me about",
    "explain",
    "definition",
    "install",
    "setup",
    "configure",
    "tutorial",
    "guide",
    "example",
    "documentation",
    "help",
];

/// Ties go to `Complex` only for questions longer than this.
const LONG_QUESTION_CHARS: usize = 80;

/// Classify a question as `Simple` or `Complex`. Never returns `Auto`.
pub fn classify_question(question: &str) -> TaskType {
    let lower = question.to_lowercase();
    let complex = COMPLEX_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();
    let simple = SIMPLE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count();

    match complex.cmp(&simple) {
        std::cmp::Ordering::Greater => TaskType::Complex,
        std::cmp::Ordering::Less => TaskType::Simple,
        std::cmp::Ordering::Equal if question.chars().count() > LONG_QUESTION_CHARS => {
            TaskType::Complex
        }
        std::cmp::Ordering::Equal => TaskType::Simple,
    }
}
