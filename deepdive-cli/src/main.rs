//! DeepDive CLI: terminal interface for the DeepDive research engine.
//!
//! Runs research against a replay script (offline dry run) and manages the
//! layered configuration.

mod commands;
mod progress;
mod replay;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// DeepDive: parallel, hypothesis-driven research
#[derive(Parser, Debug)]
#[command(name = "deepdive", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Research a question
    Run(RunArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// The question to research
    question: String,

    /// Replay script (TOML) supplying oracle responses and tool outputs
    #[arg(short, long)]
    replay: PathBuf,

    /// Maximum concurrent workers at each fan-out level
    #[arg(long)]
    max_workers: Option<usize>,

    /// Maximum hypothesis loop iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Task type: simple, complex, auto
    #[arg(long)]
    task_type: Option<String>,

    /// Run a single research pipeline instead of orchestrating sub-agents
    #[arg(long)]
    single: bool,

    /// Write the full outcome as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show the effective configuration
    Show,
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "deepdive", "deepdive")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "deepdive.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.quiet).await
}
