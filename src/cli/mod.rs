//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `sync` - Extract streams as RECORD/STATE messages on stdout
//! - `validate` - Check the config and catalog offline
//! - `streams` - List catalog streams

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
