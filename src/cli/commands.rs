//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keep a local mirror of a remote event collection in sync
#[derive(Parser, Debug)]
#[command(name = "event-mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true, default_value = "event-mirror.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sync pass
    Sync,

    /// Run sync passes on an interval until interrupted
    Watch {
        /// Seconds between passes
        #[arg(short, long, default_value = "300")]
        interval: u64,
    },

    /// Show checkpoint and mirror status
    Status,

    /// Print the mirrored payload of one item
    Get {
        /// Item id
        id: String,
    },

    /// Clear checkpoint and mirror; the next sync is a full sync
    Reset,

    /// Validate the configuration file
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
