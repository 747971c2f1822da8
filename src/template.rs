//! `{{ root.path }}` interpolation for catalog request definitions
//!
//! Paths, query parameters and search bodies may reference three roots:
//! `config.*` (tap config), `state.bookmark` (where the sync starts) and
//! `stream.*` (name, sub_type and window sizes).
//!
//! Inside a JSON body a string that is exactly one placeholder takes the
//! type of the value it refers to, so `"limit": "{{ stream.page_size }}"`
//! renders as a number.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_]\w*(?:\.[a-zA-Z_]\w*)*)\s*\}\}").unwrap()
});

/// Roots a placeholder may start with
pub const TEMPLATE_ROOTS: [&str; 3] = ["config", "state", "stream"];

/// Values placeholders are resolved against
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub config: Value,
    pub state: Value,
    pub stream: Value,
}

impl TemplateContext {
    pub fn new(config: Value) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: Value) -> Self {
        self.stream = stream;
        self
    }

    /// Resolve a dotted path such as `state.bookmark`
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = match segments.next()? {
            "config" => &self.config,
            "state" => &self.state,
            "stream" => &self.stream,
            _ => return None,
        };
        segments.try_fold(root, |value, key| value.as_object()?.get(key))
    }
}

/// Substitute every placeholder in `template`
///
/// All unresolved placeholders are reported together.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        match ctx.lookup(&caps[1]) {
            Some(value) => scalar_text(value),
            None => {
                missing.push(caps[1].to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Render every key and string inside a JSON value
pub fn render_value(value: &Value, ctx: &TemplateContext) -> Result<Value> {
    match value {
        Value::String(s) => {
            if let Some(path) = sole_placeholder(s) {
                return ctx
                    .lookup(path)
                    .cloned()
                    .ok_or_else(|| Error::undefined_var(path));
            }
            render(s, ctx).map(Value::String)
        }
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| -> Result<(String, Value)> {
                Ok((render(k, ctx)?, render_value(v, ctx)?))
            })
            .collect::<Result<serde_json::Map<_, _>>>()
            .map(Value::Object),
        Value::Array(items) => items
            .iter()
            .map(|v| render_value(v, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        _ => Ok(value.clone()),
    }
}

/// Placeholder paths in `template`, in order of appearance
pub fn variables(template: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Placeholders anywhere in `value` whose root is not one of [`TEMPLATE_ROOTS`]
pub fn unknown_roots(value: &Value) -> Vec<String> {
    let mut strings = Vec::new();
    collect_strings(value, &mut strings);

    strings
        .into_iter()
        .flat_map(variables)
        .filter(|var| {
            let root = var.split('.').next().unwrap_or_default();
            !TEMPLATE_ROOTS.contains(&root)
        })
        .collect()
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Object(map) => {
            for (k, v) in map {
                out.push(k);
                collect_strings(v, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn sole_placeholder(s: &str) -> Option<&str> {
    let caps = PLACEHOLDER.captures(s)?;
    (caps.get(0)?.as_str() == s.trim()).then(|| caps.get(1).map(|m| m.as_str()))?
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
