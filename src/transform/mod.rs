//! Record transformer module
//!
//! Turns a raw page response into canonical records and fingerprints them.
//!
//! # Overview
//!
//! The transform module provides:
//! - `RecordTransformer` - pure `raw response → records` step, shared by pool workers
//! - `JsonTransformer` - default implementation (record path + snake_case keys)
//! - `Fingerprint` / `RecordSet` / `Page` - the values reconciliation compares

mod fingerprint;
mod normalize;

pub use fingerprint::{Fingerprint, Page, RecordSet};
pub use normalize::{extract_records, snake_case_keys, to_snake_case, validate_record_path};

use crate::error::{Error, Result};
use crate::http::RawResponse;
use crate::types::Record;

/// What the transformer knows about the stream a page belongs to
#[derive(Debug, Clone, Default)]
pub struct StreamContext {
    /// Stream name
    pub stream: String,
    /// Sub-type discriminator (e.g. "self", "notes")
    pub sub_type: Option<String>,
    /// Path to the record array inside the response body
    pub record_path: Option<String>,
}

impl StreamContext {
    /// Create a context for a stream
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            ..Default::default()
        }
    }

    /// Set the sub-type
    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    /// Set the record path
    #[must_use]
    pub fn with_record_path(mut self, path: impl Into<String>) -> Self {
        self.record_path = Some(path.into());
        self
    }
}

/// Converts a raw response into an ordered sequence of records
///
/// Implementations must be pure: they are called concurrently from pool
/// workers with no shared state.
pub trait RecordTransformer: Send + Sync {
    /// Transform one page
    fn transform(&self, raw: &RawResponse, ctx: &StreamContext) -> Result<Vec<Record>>;
}

impl<F> RecordTransformer for F
where
    F: Fn(&RawResponse, &StreamContext) -> Result<Vec<Record>> + Send + Sync,
{
    fn transform(&self, raw: &RawResponse, ctx: &StreamContext) -> Result<Vec<Record>> {
        self(raw, ctx)
    }
}

/// Default transformer for JSON APIs
#[derive(Debug, Clone, Copy)]
pub struct JsonTransformer {
    snake_case: bool,
}

impl Default for JsonTransformer {
    fn default() -> Self {
        Self { snake_case: true }
    }
}

impl JsonTransformer {
    /// Create a transformer that snake_cases keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transformer that leaves keys untouched
    pub fn preserve_keys() -> Self {
        Self { snake_case: false }
    }
}

impl RecordTransformer for JsonTransformer {
    fn transform(&self, raw: &RawResponse, ctx: &StreamContext) -> Result<Vec<Record>> {
        let body: serde_json::Value = serde_json::from_slice(&raw.body).map_err(|e| {
            Error::unexpected_shape(&ctx.stream, format!("response is not valid JSON: {e}"))
        })?;

        let records = extract_records(body, ctx)?;
        if !self.snake_case {
            return Ok(records);
        }

        Ok(records.into_iter().map(snake_case_keys).collect())
    }
}
