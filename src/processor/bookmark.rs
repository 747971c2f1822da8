//! Bookmark values and their ordering

use crate::types::JsonValue;
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::fmt;

/// A bookmark value, ordered as a timestamp, a number or text
///
/// Two timestamps compare as instants, so `2024-01-01T02:00:00+02:00` equals
/// `2024-01-01T00:00:00Z`. Two numbers compare numerically and two texts
/// lexically. Values of different kinds order by kind: timestamps, then
/// numbers, then text.
#[derive(Debug, Clone)]
pub struct BookmarkValue {
    raw: String,
    key: SortKey,
}

#[derive(Debug, Clone, Copy)]
enum SortKey {
    Instant(DateTime<Utc>),
    Number(f64),
    Text,
}

impl BookmarkValue {
    /// Parse a bookmark from its text form
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let key = parse_instant(&raw)
            .map(SortKey::Instant)
            .or_else(|| raw.parse::<f64>().ok().map(SortKey::Number))
            .unwrap_or(SortKey::Text);
        Self { raw, key }
    }

    /// Bookmark from a record field; `None` for null, objects and arrays
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(Self::parse(s.as_str())),
            JsonValue::Number(n) => Some(Self {
                raw: n.to_string(),
                key: SortKey::Number(n.as_f64().unwrap_or_default()),
            }),
            _ => None,
        }
    }

    /// Text form, as persisted in state
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Instant, when the value is a timestamp
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self.key {
            SortKey::Instant(at) => Some(at),
            _ => None,
        }
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    // Offsets without a colon, e.g. 2024-01-01T10:00:00.000+0000
    if let Ok(at) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

impl SortKey {
    fn rank(self) -> u8 {
        match self {
            SortKey::Instant(_) => 0,
            SortKey::Number(_) => 1,
            SortKey::Text => 2,
        }
    }
}

impl Ord for BookmarkValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.key, other.key) {
            (SortKey::Instant(a), SortKey::Instant(b)) => a.cmp(&b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(&b),
            (SortKey::Text, SortKey::Text) => self.raw.cmp(&other.raw),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for BookmarkValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BookmarkValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BookmarkValue {}

impl fmt::Display for BookmarkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
