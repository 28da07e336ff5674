//! CLI subcommand handlers.

use crate::progress::ProgressPrinter;
use crate::replay;
use crate::{Commands, ConfigAction, RunArgs};
use deepdive_core::{
    ConfigOverrides, ResearchConfig, ResearchEngine, ResearchMode, ResearchOutcome, TaskType,
};
use std::path::Path;
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path, quiet: bool) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => handle_run(args, workspace, quiet).await,
        Commands::Config { action } => handle_config(action, workspace),
    }
}

/// Command-line flags as the topmost configuration layer.
fn overrides(args: &RunArgs) -> anyhow::Result<ConfigOverrides> {
    let task_type = args
        .task_type
        .as_deref()
        .map(str::parse::<TaskType>)
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid --task-type: {}", e))?;
    Ok(ConfigOverrides {
        max_workers: args.max_workers,
        max_iterations: args.max_iterations,
        task_type,
        mode: args.single.then_some(ResearchMode::Single),
    })
}

async fn handle_run(args: RunArgs, workspace: &Path, quiet: bool) -> anyhow::Result<()> {
    let flags = overrides(&args)?;
    let config = deepdive_core::load_config(Some(workspace), Some(&flags))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let (provider, tools) = replay::load(&args.replay)?;
    let mut engine = ResearchEngine::new(config, provider, tools)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if !quiet {
        engine = engine.with_callback(Arc::new(ProgressPrinter));
    }

    let outcome = engine
        .research(&args.question)
        .await
        .map_err(|e| anyhow::anyhow!("Research failed: {}", e))?;

    println!("{}", render_report(&outcome));

    if let Some(path) = &args.output {
        std::fs::write(path, outcome.to_json()?)?;
        if !quiet {
            eprintln!("Outcome written to {}", path.display());
        }
    }
    Ok(())
}

/// Human-readable summary of an outcome.
fn render_report(outcome: &ResearchOutcome) -> String {
    let mut report = String::new();
    match outcome {
        ResearchOutcome::Orchestrated(result) => {
            report.push_str(&format!(
                "Question: {}\nSub-agents: {} ({} failed, {} without hypothesis verification)\nAggregate confidence: {:.2}\n",
                result.original_question,
                result.sub_results.len(),
                result.failed_sub_agents.len(),
                result.direct_research_sub_agents.len(),
                result.aggregate_confidence
            ));
            if let Some(error) = &result.aggregation_error {
                report.push_str(&format!("Aggregation failed: {error}\n"));
            }
            report.push_str(&format!(
                "Tokens: {} in / {} out\n",
                result.usage.input_tokens, result.usage.output_tokens
            ));
        }
        ResearchOutcome::Single(result) => {
            report.push_str(&format!(
                "Question: {}\nTask type: {}\nConfidence: {}\n",
                result.question, result.task_type, result.confidence
            ));
            if let Some(error) = result.error() {
                report.push_str(&format!("Failed: {error}\n"));
            }
            if let Some(termination) = &result.loop_termination {
                report.push_str(&format!(
                    "Hypothesis loop: {} iteration(s), {:?}\n",
                    result.iterations, termination
                ));
            }
        }
    }
    report.push_str(&format!("\n{}", outcome.final_answer()));
    report
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".deepdive");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&ResearchConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = deepdive_core::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Validate => {
            deepdive_core::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Configuration is invalid: {}", e))?;
            if deepdive_core::config::config_exists(Some(workspace)) {
                println!("Configuration is valid.");
            } else {
                println!("No configuration file found; defaults are valid.");
            }
            Ok(())
        }
    }
}
