//! Replay scripts: offline oracle responses and canned tool outputs for dry runs.

use anyhow::Context;
use deepdive_core::{LlmProvider, ReplayScript, ToolRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load a replay script into a provider and the tools it declares.
pub fn load(path: &Path) -> anyhow::Result<(Arc<dyn LlmProvider>, ToolRegistry)> {
    let script = ReplayScript::from_file(path)
        .with_context(|| format!("Failed to read replay script {}", path.display()))?;
    let (provider, tools) =
        into_parts(script).with_context(|| format!("Invalid replay script {}", path.display()))?;
    debug!(
        path = %path.display(),
        model = provider.model_name(),
        tools = tools.len(),
        "Replay script ready"
    );
    Ok((provider, tools))
}

fn into_parts(script: ReplayScript) -> anyhow::Result<(Arc<dyn LlmProvider>, ToolRegistry)> {
    let (provider, tools) = script.into_parts()?;
    Ok((Arc::new(provider), tools))
}
