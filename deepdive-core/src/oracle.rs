//! Oracle module: reasoning-oracle abstraction and interaction.
//!
//! Defines the `LlmProvider` trait for model-agnostic completions and the
//! `ReasoningOracle` wrapper the research engine talks to. The wrapper owns
//! prompt framing (system prompt, purpose tag), the context-window guard,
//! optional transient-error retries, and per-invocation usage accounting.

use crate::error::{ConfigError, LlmError};
use crate::tools::{StaticTool, ToolRegistry};
use crate::types::{CompletionRequest, CompletionResponse, Message, OracleCall, TokenUsage};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Trait for oracle providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Estimate the token count for a set of messages.
    fn estimate_tokens(&self, messages: &[Message]) -> usize {
        // ~4 chars per token plus per-message framing
        messages
            .iter()
            .map(|m| m.content.len() / 4 + 4)
            .sum::<usize>()
            + 3
    }

    /// Return the context window size for this provider/model.
    fn context_window(&self) -> usize {
        128_000
    }

    /// Return the model name.
    fn model_name(&self) -> &str;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The oracle wraps an LLM provider and adds the framing every engine call needs.
///
/// One instance is created per top-level invocation and shared (via `Arc`)
/// by every concurrent task of that invocation.
pub struct ReasoningOracle {
    provider: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
    max_retries: usize,
    usage: Mutex<TokenUsage>,
    calls: Mutex<HashMap<OracleCall, usize>>,
}

impl ReasoningOracle {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            system_prompt: None,
            max_retries: 0,
            usage: Mutex::new(TokenUsage::default()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Forward an opaque system prompt with every call.
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt.filter(|s| !s.trim().is_empty());
        self
    }

    /// Retry transient errors up to `max_retries` times.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Construct messages for the oracle with the system prompt prepended.
    pub fn build_messages(&self, prompt: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        messages
    }

    /// Ask the oracle for a completion and return its text.
    pub async fn ask(&self, purpose: OracleCall, prompt: &str) -> Result<String, LlmError> {
        let messages = self.build_messages(prompt);
        let token_estimate = self.provider.estimate_tokens(&messages);
        let context_limit = self.provider.context_window();
        if token_estimate > context_limit {
            return Err(LlmError::ContextOverflow {
                used: token_estimate,
                limit: context_limit,
            });
        }

        *lock(&self.calls).entry(purpose).or_insert(0) += 1;
        debug!(
            model = self.provider.model_name(),
            purpose = %purpose,
            estimated_tokens = token_estimate,
            "Sending oracle request"
        );

        let request = CompletionRequest {
            messages,
            purpose: Some(purpose),
        };
        let response = self.complete_with_retry(request).await?;
        lock(&self.usage).accumulate(&response.usage);

        debug!(
            purpose = %purpose,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Oracle response received"
        );
        Ok(response.message.content)
    }

    /// Send a request with retry logic and exponential backoff.
    ///
    /// Retries on transient errors (RateLimited, Timeout, Connection) with
    /// backoff of 1s, 2s, 4s, ... capped at 32s. Other errors return immediately.
    async fn complete_with_retry(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let mut attempt = 0;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    let backoff_secs = 1u64 << attempt.min(5);
                    let wait = match &e {
                        LlmError::RateLimited { retry_after_secs } => {
                            std::cmp::max(*retry_after_secs, backoff_secs)
                        }
                        _ => backoff_secs,
                    };
                    info!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_secs = wait,
                        error = %e,
                        "Retrying oracle call after transient error"
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(purpose = ?request.purpose, error = %e, "Oracle call failed");
                    return Err(e);
                }
            }
        }
    }

    /// Check if an oracle error is transient and may be retried.
    pub fn is_retryable(error: &LlmError) -> bool {
        matches!(
            error,
            LlmError::RateLimited { .. } | LlmError::Timeout { .. } | LlmError::Connection { .. }
        )
    }

    /// Total token usage across all calls made through this oracle.
    pub fn total_usage(&self) -> TokenUsage {
        *lock(&self.usage)
    }

    /// Number of calls made for a given purpose.
    pub fn call_count(&self, purpose: OracleCall) -> usize {
        lock(&self.calls).get(&purpose).copied().unwrap_or(0)
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

/// A mock LLM provider for testing and development.
pub struct MockLlmProvider {
    model: String,
    context_window: usize,
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            context_window: 128_000,
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockLlmProvider that returns the given text for many calls.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        for _ in 0..20 {
            provider.queue_response(text);
        }
        provider
    }

    /// Shrink the advertised context window.
    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, text: impl Into<String>) {
        lock(&self.responses).push_back(text.into());
    }

    /// All requests received so far.
    pub fn received_requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// Create a simple text response.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        lock(&self.requests).push(request);
        let next = lock(&self.responses).pop_front();
        Ok(MockLlmProvider::text_response(
            next.as_deref()
                .unwrap_or("I'm a mock oracle. No queued responses available."),
        ))
    }

    fn context_window(&self) -> usize {
        self.context_window
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Canned responses keyed by oracle purpose, as read from a replay file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    /// Model name to report.
    #[serde(default)]
    pub model: Option<String>,
    /// Response served whenever a purpose's queue is empty, keyed by purpose name.
    #[serde(default)]
    pub defaults: HashMap<String, String>,
    /// Responses served in order, one per call, keyed by purpose name.
    #[serde(default)]
    pub queues: HashMap<String, Vec<String>>,
    /// Canned tool outputs, keyed by tool name.
    #[serde(default)]
    pub tools: HashMap<String, String>,
}

impl ReplayScript {
    /// Parse a replay script from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Read and parse a replay script file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?)
    }

    /// Split the script into a replaying provider and a registry of the
    /// static tools it declares.
    pub fn into_parts(self) -> crate::Result<(ScriptedLlmProvider, ToolRegistry)> {
        let mut tools = ToolRegistry::new();
        for (name, response) in &self.tools {
            tools.register(Arc::new(StaticTool::new(name.as_str(), response.as_str())))?;
        }
        debug!(
            tools = tools.len(),
            purposes = self.defaults.len() + self.queues.len(),
            "Loaded replay script"
        );
        let provider = ScriptedLlmProvider::from_script(self)?;
        Ok((provider, tools))
    }
}

fn parse_purpose(name: &str) -> Result<OracleCall, ConfigError> {
    name.parse().map_err(|message| ConfigError::ParseError { message })
}

/// A provider that replays scripted responses per oracle purpose.
///
/// Each purpose has its own queue; once it drains the purpose's default is
/// served. A purpose with neither yields `LlmError::ApiRequest`. Used for
/// offline dry runs and deterministic integration tests.
pub struct ScriptedLlmProvider {
    model: String,
    defaults: HashMap<OracleCall, String>,
    queues: Mutex<HashMap<OracleCall, VecDeque<String>>>,
}

impl ScriptedLlmProvider {
    /// An empty script; every call fails until responses are added.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            defaults: HashMap::new(),
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Build a provider from a parsed script, rejecting unknown purpose names.
    pub fn from_script(script: ReplayScript) -> Result<Self, ConfigError> {
        let mut defaults = HashMap::new();
        for (name, text) in script.defaults {
            defaults.insert(parse_purpose(&name)?, text);
        }
        let mut queues = HashMap::new();
        for (name, responses) in script.queues {
            queues.insert(parse_purpose(&name)?, VecDeque::from(responses));
        }
        Ok(Self {
            model: script.model.unwrap_or_else(|| "replay".to_string()),
            defaults,
            queues: Mutex::new(queues),
        })
    }

    /// Parse a replay script from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::from_script(ReplayScript::from_toml_str(text)?)
    }

    /// Set the response served when `purpose` has nothing queued.
    pub fn with_default(mut self, purpose: OracleCall, text: impl Into<String>) -> Self {
        self.defaults.insert(purpose, text.into());
        self
    }

    /// Queue one response for `purpose`.
    pub fn with_queued(self, purpose: OracleCall, text: impl Into<String>) -> Self {
        lock(&self.queues)
            .entry(purpose)
            .or_default()
            .push_back(text.into());
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let purpose = request.purpose.ok_or_else(|| LlmError::ApiRequest {
            message: "replay provider requires a tagged request".to_string(),
        })?;
        let queued = lock(&self.queues)
            .get_mut(&purpose)
            .and_then(|queue| queue.pop_front());
        let text = match queued.or_else(|| self.defaults.get(&purpose).cloned()) {
            Some(text) => text,
            None => {
                return Err(LlmError::ApiRequest {
                    message: format!("no scripted response for {purpose}"),
                });
            }
        };
        let input_tokens = self.estimate_tokens(&request.messages);
        Ok(CompletionResponse {
            usage: TokenUsage {
                input_tokens,
                output_tokens: text.len() / 4,
            },
            message: Message::assistant(text),
            model: self.model.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
