//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.
//!
//! ```json
//! {
//!   "currently_syncing": "loans",
//!   "bookmarks": {
//!     "clients": { "bookmark": "2024-03-01T10:00:00Z" },
//!     "loan_accounts": { "sub_types": { "notes": "2024-02-11T00:00:00Z" } }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete state for a tap run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Stream being synced when the state was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currently_syncing: Option<String>,

    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: HashMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.bookmarks.entry(stream.to_string()).or_default()
    }

    /// Bookmark for a stream, or one of its sub-types
    pub fn get_bookmark(&self, stream: &str, sub_type: Option<&str>) -> Option<&str> {
        self.bookmarks.get(stream)?.get(sub_type)
    }

    /// Set the bookmark for a stream, or one of its sub-types
    pub fn set_bookmark(&mut self, stream: &str, sub_type: Option<&str>, value: String) {
        self.get_stream_mut(stream).set(sub_type, value);
    }

    /// Record which stream is in progress (`None` once the sync is done)
    pub fn set_currently_syncing(&mut self, stream: Option<String>) {
        self.currently_syncing = stream;
    }
}

/// Bookmarks of a single stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Bookmark of the stream itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,

    /// Bookmarks of sub-types (e.g. "notes", "attachments")
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub sub_types: HashMap<String, String>,
}

impl StreamState {
    /// Bookmark for the stream or a sub-type
    pub fn get(&self, sub_type: Option<&str>) -> Option<&str> {
        match sub_type {
            Some(sub_type) => self.sub_types.get(sub_type).map(String::as_str),
            None => self.bookmark.as_deref(),
        }
    }

    /// Set the bookmark for the stream or a sub-type
    pub fn set(&mut self, sub_type: Option<&str>, value: String) {
        match sub_type {
            Some(sub_type) => {
                self.sub_types.insert(sub_type.to_string(), value);
            }
            None => self.bookmark = Some(value),
        }
    }
}
