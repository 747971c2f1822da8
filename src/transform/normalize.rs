//! Response shape normalization
//!
//! Extracts the record array from a response body and rewrites camelCase
//! keys to snake_case, recursively.

use super::StreamContext;
use crate::error::{Error, Result};
use crate::types::{JsonObject, Record};
use jsonpath_rust::JsonPath;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static CAP_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));

static LOWER_UPPER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Convert a camelCase or PascalCase key to snake_case
///
/// `creationDate` → `creation_date`, `loanAccountID` → `loan_account_id`.
pub fn to_snake_case(key: &str) -> String {
    let step = CAP_WORD_REGEX.replace_all(key, "${1}_${2}");
    LOWER_UPPER_REGEX
        .replace_all(&step, "${1}_${2}")
        .to_lowercase()
}

/// Rewrite every object key of a value to snake_case
pub fn snake_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let converted: JsonObject = map
                .into_iter()
                .map(|(key, value)| (to_snake_case(&key), snake_case_keys(value)))
                .collect();
            Value::Object(converted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(snake_case_keys).collect()),
        other => other,
    }
}

/// Pull the record array out of a decoded response
pub fn extract_records(body: Value, ctx: &StreamContext) -> Result<Vec<Record>> {
    let located = match ctx.record_path.as_deref() {
        None => body,
        Some(path) if path.contains('*') => extract_with_jsonpath(&body, path)?,
        Some(path) => extract_simple_path(&body, path).ok_or_else(|| {
            Error::unexpected_shape(&ctx.stream, format!("record path '{path}' not found"))
        })?,
    };

    let records = match located {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            return Err(Error::unexpected_shape(
                &ctx.stream,
                format!("expected an array of records, got {}", kind(&other)),
            ))
        }
    };

    if let Some(bad) = records.iter().find(|r| !r.is_object()) {
        return Err(Error::unexpected_shape(
            &ctx.stream,
            format!("expected object records, got {}", kind(bad)),
        ));
    }

    Ok(records)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract a value using simple dot notation (e.g., "data.items")
fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = current.get(part)?;
    }

    Some(current.clone())
}

/// Reject a record path that can never extract anything
///
/// Only wildcard paths go through the JSONPath parser; dotted paths are
/// looked up directly.
pub fn validate_record_path(path: &str) -> Result<()> {
    if path.contains('*') {
        compile_jsonpath(path)?;
    }
    Ok(())
}

fn compile_jsonpath(path: &str) -> Result<JsonPath<Value>> {
    JsonPath::<Value>::try_from(path).map_err(|e| Error::RecordExtraction {
        path: path.to_string(),
        message: format!("Invalid JSONPath: {e}"),
    })
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Value> {
    Ok(compile_jsonpath(path)?.find(value))
}
