//! Tool Registry: manages information-gathering tools and their invocation.
//!
//! Tools are registered before an engine is built and shared immutably by
//! every concurrent task. Invocation through the registry never fails: a
//! missing tool, an execution error, or an expired deadline is recorded as an
//! unsuccessful [`ToolInvocation`] so the calling task can carry on.

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Trait that all tools must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// Run the tool against a free-text query.
    async fn invoke(&self, query: &str) -> Result<String, ToolError>;
}

/// One recorded tool call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub query: String,
    pub result_text: String,
    pub success: bool,
}

impl ToolInvocation {
    pub fn succeeded(tool_name: &str, query: &str, result_text: String) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            query: query.to_string(),
            result_text,
            success: true,
        }
    }

    pub fn failed(tool_name: &str, query: &str, error: &ToolError) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            query: query.to_string(),
            result_text: error.to_string(),
            success: false,
        }
    }
}

/// The tool registry holds all registered tools and handles invocation.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Apply a deadline to every invocation.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool. Returns error if a tool with the same name is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered { name });
        }
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Unregister a tool by name.
    pub fn unregister(&mut self, name: &str) -> Result<(), ToolError> {
        if self.tools.remove(name).is_none() {
            return Err(ToolError::NotFound {
                name: name.to_string(),
            });
        }
        debug!(tool = %name, "Unregistered tool");
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// `name: description` lines for prompts.
    pub fn describe(&self) -> String {
        self.tools
            .values()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name, recording the outcome.
    pub async fn invoke(&self, name: &str, query: &str) -> ToolInvocation {
        let Some(tool) = self.tools.get(name) else {
            let err = ToolError::NotFound {
                name: name.to_string(),
            };
            warn!(tool = %name, "Query names an unregistered tool");
            return ToolInvocation::failed(name, query, &err);
        };

        debug!(tool = %name, query_len = query.len(), "Invoking tool");
        let result = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, tool.invoke(query)).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::Timeout {
                    name: name.to_string(),
                    timeout_secs: timeout.as_secs(),
                }),
            },
            None => tool.invoke(query).await,
        };

        match result {
            Ok(text) => ToolInvocation::succeeded(name, query, text),
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool invocation failed");
                ToolInvocation::failed(name, query, &e)
            }
        }
    }

    /// Invoke every registered tool with the same query, in name order.
    pub async fn invoke_all(&self, query: &str) -> Vec<ToolInvocation> {
        let mut evidence = Vec::with_capacity(self.tools.len());
        for name in self.tools.keys() {
            evidence.push(self.invoke(name, query).await);
        }
        evidence
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A tool that answers every query with the same text.
///
/// Backs replay runs where no live search is wanted.
pub struct StaticTool {
    name: String,
    description: String,
    response: String,
}

impl StaticTool {
    pub fn new(name: impl Into<String>, response: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Canned results for {name}"),
            name,
            response: response.into(),
        }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, _query: &str) -> Result<String, ToolError> {
        Ok(self.response.clone())
    }
}
