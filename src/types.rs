//! Shared aliases and small value types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub type JsonValue = serde_json::Value;

pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Query parameters and headers
pub type StringMap = HashMap<String, String>;

/// One normalized record as delivered to the processor
pub type Record = JsonValue;

/// Request method of a stream endpoint
///
/// Listing endpoints use GET; `:search` endpoints take a POST body with
/// filter and sorting criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => Self::GET,
            Method::POST => Self::POST,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the delay grows between retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    Constant,
    Linear,
    #[default]
    Exponential,
}

impl BackoffType {
    /// Delay before retry `attempt` (0-based), never above `max`
    pub fn delay(self, initial: Duration, max: Duration, attempt: u32) -> Duration {
        let factor = match self {
            BackoffType::Constant => 1,
            BackoffType::Linear => attempt.saturating_add(1),
            BackoffType::Exponential => 2u32.saturating_pow(attempt),
        };
        initial.saturating_mul(factor).min(max)
    }
}

/// Treat empty config strings as unset
pub trait OptionStringExt {
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        Some(self).none_if_empty()
    }
}
