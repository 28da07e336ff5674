//! Lenient parsing of structured oracle output.
//!
//! Oracles are asked for JSON but frequently wrap it in prose or code fences,
//! or ignore the format entirely. Each parser tries JSON first and then falls
//! back to progressively looser textual patterns.

use super::hypothesis_loop::LoopDecision;
use crate::config::TaskType;
use crate::error::LlmError;
use crate::types::OracleCall;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*[0-9]+[.)]\s+(.+?)\s*$").expect("numbered item pattern is valid")
});

static CONFIDENCE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)confidence[:\s]+([0-9]+(?:\.[0-9]+)?)").expect("confidence pattern is valid")
});

static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*%").expect("percentage pattern is valid")
});

static DECISION_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(continue|finish)\b").expect("decision pattern is valid")
});

/// Confidence assumed when a verdict carries no number at all.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Lines shorter than this are not treated as sub-problems.
const MIN_LINE_PROBLEM_CHARS: usize = 10;
const MAX_LINE_PROBLEMS: usize = 5;

fn parse_error(call: OracleCall, message: impl Into<String>) -> LlmError {
    LlmError::ResponseParse {
        call: call.to_string(),
        message: message.into(),
    }
}

/// Extract the outermost JSON object from free text.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Items of a `1. foo` / `2) bar` list, in order.
pub fn numbered_items(text: &str) -> Vec<String> {
    NUMBERED_ITEM
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Pull string items out of a JSON array whose elements are either plain
/// strings or objects carrying the text under one of `keys`.
fn json_items(value: &Value, array_key: &str, keys: &[&str]) -> Vec<String> {
    let Some(items) = value.get(array_key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(_) => keys.iter().find_map(|k| item.get(*k).and_then(Value::as_str)),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sub-problems and an optional task-type hint read from a decomposition response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDecomposition {
    pub problems: Vec<String>,
    pub task_type: Option<TaskType>,
}

/// Parse a decomposition response. Never returns an empty problem list: the
/// question itself is the last resort.
pub fn parse_decomposition(text: &str, question: &str) -> ParsedDecomposition {
    let json = extract_json_object(text);
    let task_type = json
        .as_ref()
        .and_then(|v| v.get("task_type"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<TaskType>().ok())
        .filter(|t| *t != TaskType::Auto);

    let mut problems = json
        .as_ref()
        .map(|v| json_items(v, "sub_problems", &["problem", "question", "text"]))
        .unwrap_or_default();

    if problems.is_empty() && json.is_none() {
        problems = numbered_items(text);
    }
    if problems.is_empty() && json.is_none() {
        problems = text
            .lines()
            .map(str::trim)
            .filter(|line| line.chars().count() > MIN_LINE_PROBLEM_CHARS)
            .take(MAX_LINE_PROBLEMS)
            .map(str::to_string)
            .collect();
    }
    if problems.is_empty() {
        problems.push(question.trim().to_string());
    }

    ParsedDecomposition {
        problems,
        task_type,
    }
}

/// Parse hypothesis statements, keeping at most `max`.
pub fn parse_hypotheses(text: &str, max: usize) -> Vec<String> {
    let mut statements = match extract_json_object(text) {
        Some(json) => json_items(&json, "hypotheses", &["hypothesis", "statement"]),
        None => Vec::new(),
    };
    if statements.is_empty() {
        statements = numbered_items(text);
    }
    if statements.is_empty() {
        let whole = text.trim();
        if !whole.is_empty() {
            statements.push(whole.to_string());
        }
    }
    statements.truncate(max);
    statements
}

/// A judged hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub verified: bool,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

/// Map a raw number to [0, 1]. Values above 1 are read as percentages.
pub fn normalize_confidence(raw: f64) -> f64 {
    if !raw.is_finite() {
        return DEFAULT_CONFIDENCE;
    }
    let value = if raw > 1.0 { raw / 100.0 } else { raw };
    value.clamp(0.0, 1.0)
}

fn verdict_label(label: &str) -> Option<bool> {
    match label.trim().to_lowercase().as_str() {
        "verified" | "accepted" | "supported" | "true" => Some(true),
        "rejected" | "refuted" | "falsified" | "false" => Some(false),
        _ => None,
    }
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Parse a judge response. An explicit verdict label wins; otherwise the
/// hypothesis is verified when its confidence reaches `acceptance_threshold`.
pub fn parse_verdict(text: &str, acceptance_threshold: f64) -> Result<Verdict, LlmError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(parse_error(OracleCall::Judge, "empty response"));
    }

    let json = extract_json_object(trimmed);
    let label = json
        .as_ref()
        .and_then(|v| v.get("verdict"))
        .and_then(Value::as_str)
        .and_then(verdict_label);
    let reasoning = json
        .as_ref()
        .and_then(|v| v.get("reasoning"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let raw = json
        .as_ref()
        .and_then(|v| v.get("confidence"))
        .and_then(json_number)
        .or_else(|| {
            CONFIDENCE_LABEL
                .captures(trimmed)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .or_else(|| {
            PERCENTAGE
                .captures(trimmed)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .map(|pct| pct / 100.0)
        });

    let confidence = raw.map_or(DEFAULT_CONFIDENCE, normalize_confidence);
    Ok(Verdict {
        verified: label.unwrap_or(confidence >= acceptance_threshold),
        confidence,
        reasoning,
    })
}

/// Parse a continue/finish decision. The first keyword in the text wins.
pub fn parse_decision(text: &str) -> Result<LoopDecision, LlmError> {
    let word = DECISION_WORD
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .ok_or_else(|| parse_error(OracleCall::Decide, "expected CONTINUE or FINISH"))?;
    Ok(if word == "continue" {
        LoopDecision::Continue
    } else {
        LoopDecision::Finish
    })
}

/// One tool query chosen by the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub tool: String,
    pub query: String,
}

/// Parse a research plan. `None` when the response holds no usable queries.
pub fn parse_research_plan(text: &str) -> Option<Vec<PlannedQuery>> {
    let json = extract_json_object(text)?;
    let queries: Vec<PlannedQuery> = json
        .get("queries")?
        .as_array()?
        .iter()
        .filter_map(|item| {
            let tool = item.get("tool")?.as_str()?.trim();
            let query = item.get("query")?.as_str()?.trim();
            (!tool.is_empty() && !query.is_empty()).then(|| PlannedQuery {
                tool: tool.to_string(),
                query: query.to_string(),
            })
        })
        .collect();
    (!queries.is_empty()).then_some(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_json_from_fenced_text() {
        let text = "Sure!\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_json_object(text), Some(serde_json::json!({"a": 1})));
        assert_eq!(extract_json_object("no braces"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_decomposition_from_json() {
        let text = r#"{"original_question": "q", "task_type": "complex",
            "sub_problems": [{"id": 1, "problem": "What drives cost?"}, {"id": 2, "problem": "  "}, "How fast is it?"]}"#;
        let parsed = parse_decomposition(text, "q");
        assert_eq!(parsed.problems, vec!["What drives cost?", "How fast is it?"]);
        assert_eq!(parsed.task_type, Some(TaskType::Complex));
    }

    #[test]
    fn test_decomposition_from_numbered_list() {
        let text = "Sub-problems:\n1. Measure latency\n2) Measure throughput\n";
        let parsed = parse_decomposition(text, "q");
        assert_eq!(parsed.problems, vec!["Measure latency", "Measure throughput"]);
        assert_eq!(parsed.task_type, None);
    }

    #[test]
    fn test_decomposition_from_long_lines_capped() {
        let text = (0..8)
            .map(|i| format!("line number {i} is long enough"))
            .chain(["short".to_string()])
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = parse_decomposition(&text, "q");
        assert_eq!(parsed.problems.len(), 5);
        assert_eq!(parsed.problems[0], "line number 0 is long enough");
    }

    #[test]
    fn test_decomposition_falls_back_to_question() {
        let parsed = parse_decomposition("ok", "  Why is the sky blue?  ");
        assert_eq!(parsed.problems, vec!["Why is the sky blue?"]);
        let parsed = parse_decomposition(r#"{"sub_problems": []}"#, "Why?");
        assert_eq!(parsed.problems, vec!["Why?"]);
    }

    #[test]
    fn test_decomposition_ignores_auto_hint() {
        let parsed = parse_decomposition(r#"{"sub_problems": ["a"], "task_type": "auto"}"#, "q");
        assert_eq!(parsed.task_type, None);
    }

    #[test]
    fn test_hypotheses_json_numbered_and_whole() {
        let json = r#"{"hypotheses": [{"id": 1, "hypothesis": "H1"}, {"id": 2, "statement": "H2"}]}"#;
        assert_eq!(parse_hypotheses(json, 4), vec!["H1", "H2"]);
        assert_eq!(parse_hypotheses("1. A\n2. B\n3. C", 2), vec!["A", "B"]);
        assert_eq!(parse_hypotheses("  Caching halves latency. ", 4), vec![
            "Caching halves latency."
        ]);
        assert!(parse_hypotheses("   ", 4).is_empty());
    }

    #[test]
    fn test_verdict_from_json_label_wins() {
        let verdict = parse_verdict(
            r#"{"verdict": "rejected", "confidence": 0.9, "reasoning": "contradicted"}"#,
            0.6,
        )
        .unwrap();
        assert!(!verdict.verified);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.reasoning.as_deref(), Some("contradicted"));
    }

    #[test]
    fn test_verdict_from_text_uses_threshold() {
        let verdict = parse_verdict("Supported. Confidence: 0.75", 0.6).unwrap();
        assert!(verdict.verified);
        assert_eq!(verdict.confidence, 0.75);

        let verdict = parse_verdict("confidence 45", 0.6).unwrap();
        assert!(!verdict.verified);
        assert_eq!(verdict.confidence, 0.45);

        let verdict = parse_verdict("I am about 80% sure", 0.6).unwrap();
        assert_eq!(verdict.confidence, 0.8);
        assert!(verdict.verified);
    }

    #[test]
    fn test_verdict_defaults_and_clamps() {
        let verdict = parse_verdict("Looks plausible.", 0.6).unwrap();
        assert_eq!(verdict.confidence, DEFAULT_CONFIDENCE);
        assert!(!verdict.verified);

        let verdict = parse_verdict(r#"{"confidence": 250}"#, 0.6).unwrap();
        assert_eq!(verdict.confidence, 1.0);

        let verdict = parse_verdict(r#"{"verdict": "verified", "confidence": "70%"}"#, 0.6).unwrap();
        assert_eq!(verdict.confidence, 0.7);
    }

    #[test]
    fn test_verdict_empty_is_error() {
        let err = parse_verdict("  \n", 0.6).unwrap_err();
        assert!(matches!(err, LlmError::ResponseParse { .. }));
    }

    #[test]
    fn test_normalize_confidence() {
        assert_eq!(normalize_confidence(-0.2), 0.0);
        assert_eq!(normalize_confidence(85.0), 0.85);
        assert_eq!(normalize_confidence(f64::NAN), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_decision_earliest_keyword_wins() {
        assert_eq!(parse_decision("CONTINUE").unwrap(), LoopDecision::Continue);
        assert_eq!(parse_decision("finish.").unwrap(), LoopDecision::Finish);
        assert_eq!(
            parse_decision("We should FINISH rather than continue").unwrap(),
            LoopDecision::Finish
        );
        assert_eq!(
            parse_decision("Continue; do not finish yet").unwrap(),
            LoopDecision::Continue
        );
    }

    #[test]
    fn test_decision_unparseable_is_error() {
        let err = parse_decision("Maybe? Hard to say.").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not parse decide response: expected CONTINUE or FINISH"
        );
        assert!(parse_decision("discontinued").is_err());
    }

    #[test]
    fn test_research_plan() {
        let text = r#"{"analysis": "needs papers", "queries": [
            {"tool": "arxiv", "query": "prompt caching"},
            {"tool": "", "query": "skip me"},
            {"tool": "web_search", "query": "prompt caching pricing"}]}"#;
        let plan = parse_research_plan(text).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].tool, "web_search");

        assert!(parse_research_plan(r#"{"queries": []}"#).is_none());
        assert!(parse_research_plan("search everything").is_none());
    }
}
