//! Transport abstraction used by the request pool
//!
//! The pool only needs "send this page request, give me the body back".
//! `HttpClient` is the production implementation; tests plug in scripted
//! transports.

use crate::error::Result;
use crate::types::{JsonValue, Method, StringMap};
use async_trait::async_trait;
use bytes::Bytes;

/// Raw response returned by a transport
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Undecoded response body
    pub body: Bytes,
}

impl RawResponse {
    /// Create a response with status 200
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Create a 200 response from a JSON value
    pub fn json(value: &JsonValue) -> Self {
        Self::ok(value.to_string())
    }

    /// Body as UTF-8 text (lossy)
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Sends a single request to the remote API
///
/// Implementations own their transient-failure retry policy; an `Err`
/// returned from `send` is final for that request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response
    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &StringMap,
        body: Option<&JsonValue>,
    ) -> Result<RawResponse>;
}
