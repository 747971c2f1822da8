//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract offset-paginated API streams as Singer messages
#[derive(Parser, Debug)]
#[command(name = "overlap-tap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Tap configuration file (JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Stream catalog (YAML)
    #[arg(short = 'c', long, global = true)]
    pub catalog: Option<PathBuf>,

    /// State file (JSON); checkpoints are written back to it
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Output format for informational commands
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync streams, writing RECORD and STATE messages to stdout
    Sync {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,
    },

    /// Validate the config and catalog without contacting the API
    Validate,

    /// List catalog streams with their deduplication keys
    Streams,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

impl Commands {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Sync { .. } => "sync",
            Commands::Validate => "validate",
            Commands::Streams => "streams",
        }
    }

    /// Stream names selected by `--streams`
    pub fn stream_filter(&self) -> Vec<String> {
        match self {
            Commands::Sync {
                streams: Some(streams),
            } => streams
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }
}
