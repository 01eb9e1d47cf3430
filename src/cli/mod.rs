//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `extract` - Run an extraction through the configured backends
//! - `dlq` - Inspect and replay dead-lettered operations
//! - `metrics` - Show per-backend health, quality, and cost
//! - `config` - Configuration utilities (init)

pub mod app;
pub mod config;
pub mod dlq;
pub mod extract;
pub mod metrics;
pub mod output;

pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Quorum - resilient multi-backend extraction orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "quorum",
    version,
    about = "Resilient multi-backend extraction orchestrator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an extraction
    Extract(ExtractArgs),
    /// Dead-letter queue operations
    #[command(subcommand)]
    Dlq(DlqCommands),
    /// Show per-backend metrics
    Metrics(MetricsArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "quorum.toml")]
    pub config: PathBuf,

    /// File containing the text to extract from ('-' for stdin)
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Source label attached to the request
    #[arg(short, long, default_value = "cli")]
    pub source: String,

    /// Correlation id (generated when omitted)
    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Override the configured orchestration strategy
    #[arg(long, env = "QUORUM_STRATEGY")]
    pub strategy: Option<crate::orchestrator::Strategy>,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum DlqCommands {
    /// List pending entries
    List(DlqListArgs),
    /// Replay one entry by id
    Replay(DlqReplayArgs),
    /// Replay a batch of pending entries
    ReplayBatch(DlqReplayBatchArgs),
    /// Mark an entry resolved without replaying it
    Complete(DlqCompleteArgs),
}

#[derive(Args, Debug)]
pub struct DlqListArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "quorum.toml")]
    pub config: PathBuf,

    /// Only entries of this operation type
    #[arg(short, long)]
    pub operation_type: Option<String>,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DlqReplayArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "quorum.toml")]
    pub config: PathBuf,

    /// Entry id to replay
    pub id: String,
}

#[derive(Args, Debug)]
pub struct DlqReplayBatchArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "quorum.toml")]
    pub config: PathBuf,

    /// Operation type to replay
    #[arg(short, long, default_value = "extract")]
    pub operation_type: String,

    /// Maximum entries to replay
    #[arg(short, long, default_value_t = 10)]
    pub max: usize,
}

#[derive(Args, Debug)]
pub struct DlqCompleteArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "quorum.toml")]
    pub config: PathBuf,

    /// Entry id to mark resolved
    pub id: String,
}

#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "quorum.toml")]
    pub config: PathBuf,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write an example configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output path
    #[arg(short, long, default_value = "quorum.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}
