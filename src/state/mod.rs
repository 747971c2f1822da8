//! State management module
//!
//! Handles bookmark tracking, checkpointing, and resumability.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - per-stream and per-sub-type bookmarks plus the
//!   currently-syncing marker
//! - `StateManager` - File-based state persistence
//! - Checkpointing for resumable syncs

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{State, StreamState};
