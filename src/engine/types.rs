//! Engine types
//!
//! Window parameters, request templates and statistics for the fetch engine.

use crate::error::{Error, Result};
use crate::pool::PageRequest;
use crate::types::{BackoffType, JsonValue, Method, StringMap};
use std::time::Duration;

/// Default logical page size
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Default number of extra records requested past each page
pub const DEFAULT_OVERLAP_WINDOW: usize = 20;

/// Default ceiling on buffered plus in-flight records
pub const DEFAULT_BATCH_LIMIT: usize = 10_000;

/// Default number of attempts for a cycle that fails to reconcile
pub const DEFAULT_MAX_CORRECTION_ATTEMPTS: u32 = 5;

/// Upper bound accepted for `max_correction_attempts`
pub const MAX_CORRECTION_ATTEMPTS: u32 = 5;

/// Overlapping window parameters
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Logical page size; the offset advances by this much per request
    pub page_size: usize,
    /// Extra records requested beyond the page so neighbours overlap
    pub overlap_window: usize,
    /// Maximum buffered plus in-flight records before a cycle stops adding requests
    pub batch_limit: usize,
    /// Offset of the first request
    pub start_offset: u64,
    /// Attempts per cycle before giving up on reconciliation
    pub max_correction_attempts: u32,
    /// Backoff between cycle attempts
    pub backoff_type: BackoffType,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on the retry delay
    pub max_backoff: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            overlap_window: DEFAULT_OVERLAP_WINDOW,
            batch_limit: DEFAULT_BATCH_LIMIT,
            start_offset: 0,
            max_correction_attempts: DEFAULT_MAX_CORRECTION_ATTEMPTS,
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl WindowConfig {
    /// Create a window config with the given page size and overlap
    pub fn new(page_size: usize, overlap_window: usize) -> Self {
        Self {
            page_size,
            overlap_window,
            ..Self::default()
        }
    }

    /// Set the batch limit
    #[must_use]
    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit;
        self
    }

    /// Set the starting offset
    #[must_use]
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    /// Set the retry policy for cycles that fail to reconcile
    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, initial: Duration, max: Duration) -> Self {
        self.max_correction_attempts = max_attempts;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Records requested per page: page size plus overlap
    pub fn window_size(&self) -> usize {
        self.page_size + self.overlap_window
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.backoff_type.delay(
            self.initial_backoff,
            self.max_backoff,
            attempt.saturating_sub(1),
        )
    }

    /// Check the parameters make a usable window
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than 0"));
        }
        if self.overlap_window == 0 {
            return Err(Error::invalid_value(
                "overlap_window",
                "must be greater than 0, adjacent pages could not be reconciled",
            ));
        }
        if self.batch_limit == 0 {
            return Err(Error::invalid_value("batch_limit", "must be greater than 0"));
        }
        if !(1..=MAX_CORRECTION_ATTEMPTS).contains(&self.max_correction_attempts) {
            return Err(Error::invalid_value(
                "max_correction_attempts",
                format!("must be between 1 and {MAX_CORRECTION_ATTEMPTS}"),
            ));
        }
        Ok(())
    }
}

/// How to turn an offset into a page request for one endpoint
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    /// HTTP method
    pub method: Method,
    /// Endpoint path
    pub path: String,
    /// Static query parameters (sorting, detail level, ...)
    pub params: StringMap,
    /// Static JSON body (filter and sorting criteria for search endpoints)
    pub body: Option<JsonValue>,
    /// Query parameter carrying the offset
    pub offset_param: String,
    /// Query parameter carrying the limit
    pub limit_param: String,
}

impl RequestTemplate {
    /// Create a template with `offset`/`limit` parameters
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: StringMap::new(),
            body: None,
            offset_param: "offset".to_string(),
            limit_param: "limit".to_string(),
        }
    }

    /// Add a static query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Build the request for one window
    pub fn page(&self, offset: u64, limit: usize) -> PageRequest {
        let mut params = self.params.clone();
        params.insert(self.offset_param.clone(), offset.to_string());
        params.insert(self.limit_param.clone(), limit.to_string());

        PageRequest {
            method: self.method,
            path: self.path.clone(),
            params,
            body: self.body.clone(),
            offset,
        }
    }
}

/// Statistics from one engine run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Cycles that reconciled successfully
    pub cycles: usize,
    /// Page requests dispatched, retries included
    pub requests_sent: usize,
    /// Requests stopped before completing
    pub requests_cancelled: usize,
    /// Non-empty pages reconciled
    pub pages_fetched: usize,
    /// Cycle attempts that failed reconciliation or transformation
    pub correction_failures: usize,
    /// Pages whose overlap was smaller than expected
    pub partial_overlaps: usize,
    /// Records appended to the buffer
    pub records_delivered: usize,
}
