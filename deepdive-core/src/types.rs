//! Core type definitions shared by the oracle interface and the research engine.
//!
//! Defines conversation messages, completion requests/responses, token usage,
//! and the closed set of purposes the engine consults the oracle for.

use serde::{Deserialize, Serialize};

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message sent to or received from the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Why the engine is consulting the oracle.
///
/// Every request carries one of these so providers (and test doubles) can tell
/// the call sites apart without inspecting prompt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleCall {
    /// Split a question into independently researchable problems.
    Decompose,
    /// Choose tool queries for one problem.
    PlanResearch,
    /// Summarize the evidence gathered for one problem.
    SummarizeResearch,
    /// Narrative overview of all per-problem results.
    Synthesize,
    /// Propose falsifiable hypotheses.
    GenerateHypotheses,
    /// Classify one hypothesis as verified or rejected.
    Judge,
    /// Continue or finish the hypothesis loop.
    Decide,
    /// Produce the answer for one research pipeline.
    FinalAnswer,
    /// Merge sub-agent answers into the top-level answer.
    Aggregate,
}

impl OracleCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleCall::Decompose => "decompose",
            OracleCall::PlanResearch => "plan_research",
            OracleCall::SummarizeResearch => "summarize_research",
            OracleCall::Synthesize => "synthesize",
            OracleCall::GenerateHypotheses => "generate_hypotheses",
            OracleCall::Judge => "judge",
            OracleCall::Decide => "decide",
            OracleCall::FinalAnswer => "final_answer",
            OracleCall::Aggregate => "aggregate",
        }
    }
}

impl std::fmt::Display for OracleCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OracleCall {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OracleCall::ALL
            .iter()
            .copied()
            .find(|call| call.as_str() == s)
            .ok_or_else(|| format!("unknown oracle call '{s}'"))
    }
}

impl OracleCall {
    pub const ALL: [OracleCall; 9] = [
        OracleCall::Decompose,
        OracleCall::PlanResearch,
        OracleCall::SummarizeResearch,
        OracleCall::Synthesize,
        OracleCall::GenerateHypotheses,
        OracleCall::Judge,
        OracleCall::Decide,
        OracleCall::FinalAnswer,
        OracleCall::Aggregate,
    ];
}

/// Token usage statistics from an oracle call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// The result of an oracle completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    /// The response text.
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// A request to the oracle for completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub purpose: Option<OracleCall>,
}

impl CompletionRequest {
    /// The content of the last user message, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}
