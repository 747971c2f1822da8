//! Record fingerprints and fingerprint sets
//!
//! A fingerprint is the canonical JSON encoding of a record: object keys are
//! sorted at every level, so two records with the same content produce the
//! same fingerprint no matter which page or key order they arrived with.

use crate::error::Result;
use crate::types::Record;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Canonical encoding of a record's content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Arc<str>);

impl Fingerprint {
    /// Compute the fingerprint of a record
    pub fn of(record: &Record) -> Result<Self> {
        let encoded = serde_json::to_string(&Canonical(record))?;
        Ok(Self(Arc::from(encoded)))
    }

    /// The canonical encoding
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializes a JSON value with object keys in sorted order
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
                let mut out = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    out.serialize_entry(key, &Canonical(value))?;
                }
                out.end()
            }
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical)),
            other => other.serialize(serializer),
        }
    }
}

/// Insertion-ordered set of fingerprints
///
/// Iteration follows first insertion, which for fetched pages is the remote
/// API's own ordering.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    order: Vec<Fingerprint>,
    members: HashSet<Fingerprint>,
}

impl RecordSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fingerprint; returns false if it was already present
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        if self.members.contains(&fingerprint) {
            return false;
        }
        self.members.insert(fingerprint.clone());
        self.order.push(fingerprint);
        true
    }

    /// Check membership
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.members.contains(fingerprint)
    }

    /// Number of fingerprints
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.order.iter()
    }

    /// Size of the intersection with another set
    pub fn overlap(&self, other: &RecordSet) -> usize {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().filter(|fp| large.contains(fp)).count()
    }

    /// Union, keeping this set's order followed by the new members of `other`
    #[must_use]
    pub fn union(&self, other: &RecordSet) -> RecordSet {
        let mut result = self.clone();
        for fingerprint in other.iter() {
            result.insert(fingerprint.clone());
        }
        result
    }

    /// Members of this set not present in `other`, order preserved
    #[must_use]
    pub fn difference(&self, other: &RecordSet) -> RecordSet {
        self.iter()
            .filter(|fp| !other.contains(fp))
            .cloned()
            .collect()
    }
}

impl FromIterator<Fingerprint> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        for fingerprint in iter {
            set.insert(fingerprint);
        }
        set
    }
}

impl PartialEq for RecordSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for RecordSet {}

/// One transformed page: its fingerprint set plus the records keyed by fingerprint
#[derive(Debug, Clone, Default)]
pub struct Page {
    set: RecordSet,
    records: HashMap<Fingerprint, Record>,
}

impl Page {
    /// Fingerprint every record of a page
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut page = Page::default();
        for record in records {
            let fingerprint = Fingerprint::of(&record)?;
            if page.set.insert(fingerprint.clone()) {
                page.records.insert(fingerprint, record);
            }
        }
        Ok(page)
    }

    /// The page's fingerprint set
    pub fn set(&self) -> &RecordSet {
        &self.set
    }

    /// Number of distinct records
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the page had no records
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Split into the fingerprint set and the keyed records
    pub fn into_parts(self) -> (RecordSet, HashMap<Fingerprint, Record>) {
        (self.set, self.records)
    }
}
