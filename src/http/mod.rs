//! HTTP client module
//!
//! Provides the transport collaborator used by the request pool.
//!
//! # Features
//!
//! - **Transport trait**: `send(method, path, params, body)` returning a raw body
//! - **Automatic Retries**: transient failures (429, 5xx, timeouts) are retried here
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Credentials**: basic auth or API key

mod client;
mod rate_limit;
mod transport;

pub use client::{Credentials, HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use transport::{RawResponse, Transport};
