//! Error types for overlap-tap
//!
//! Every fallible operation in the crate returns [`Result`]. Errors fall in
//! three families that callers treat differently:
//!
//! - transport failures the HTTP client retries on its own ([`Error::is_retryable`]),
//! - inconsistent pages that make the engine rerun a cycle ([`Error::is_cycle_retryable`]),
//! - everything else, which ends the sync after a final checkpoint.

use thiserror::Error;

/// The error type for overlap-tap
#[derive(Error, Debug)]
pub enum Error {
    // --- config & catalog ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse catalog: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // --- transport ---
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited by server (retry after {retry_after_seconds}s)")]
    RateLimited { retry_after_seconds: u64 },

    #[error("No response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // --- fetch engine ---
    #[error("Unexpected response shape for stream '{stream}': {message}")]
    UnexpectedShape { stream: String, message: String },

    #[error("Invalid record path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    #[error(
        "Pagination drift on stream '{stream}' at offset {offset}: \
         {fetched} fetched records share nothing with the {known} already known"
    )]
    Reconciliation {
        stream: String,
        offset: u64,
        known: usize,
        fetched: usize,
    },

    #[error("Failed to error correct stream '{stream}' after {attempts} attempts: {source}")]
    CorrectionRetriesExhausted {
        stream: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Fetch worker failed: {message}")]
    Worker { message: String },

    // --- state & output ---
    #[error("State error: {message}")]
    State { message: String },

    #[error("Failed to write state checkpoint to {path}: {message}")]
    Checkpoint { path: String, message: String },

    #[error("Sink error: {message}")]
    Sink { message: String },

    // --- request templates ---
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // --- io ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// A page that was not the array of objects the stream expects
    pub fn unexpected_shape(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            stream: stream.into(),
            message: message.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Whether the HTTP client should try the same request again
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Whether the fetch engine should rerun the whole cycle
    ///
    /// Pagination drift and malformed pages both mean the cycle saw an
    /// inconsistent view of the remote dataset.
    pub fn is_cycle_retryable(&self) -> bool {
        matches!(
            self,
            Error::Reconciliation { .. } | Error::UnexpectedShape { .. }
        )
    }
}

/// Result type alias for overlap-tap
pub type Result<T> = std::result::Result<T, Error>;
