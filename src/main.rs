//! overlap-tap CLI
//!
//! Command-line interface for syncing streams

use anyhow::Context;
use clap::Parser;
use overlap_tap::cli::{Cli, Runner};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries RECORD/STATE messages, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.name();
    Runner::new(cli)
        .run()
        .await
        .with_context(|| format!("overlap-tap {command} failed"))
}
