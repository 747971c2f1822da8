//! Stream processor
//!
//! Consumes the buffered iterator of one stream, drops records already
//! emitted in this run, and advances the stream's bookmark as batches of
//! records reach the sink.
//!
//! # Overview
//!
//! - `StreamKind` - stream identity; fixes the deduplication key
//! - `BookmarkValue` - timestamp/number/text ordering for bookmark fields
//! - `StreamProcessor` - the per-record loop, checkpointing every
//!   `batch_size` emitted records
//!
//! The bookmark is only persisted after the records it covers were written
//! to the sink, and it never moves backward.

mod bookmark;
mod kind;

pub use bookmark::BookmarkValue;
pub use kind::StreamKind;

use crate::buffer::BufferedIterator;
use crate::engine::FetchStats;
use crate::error::Result;
use crate::sink::RecordSink;
use crate::state::StateManager;
use crate::transform::Fingerprint;
use crate::types::{JsonValue, Record};
use std::collections::HashSet;
use tracing::{debug, error, info, trace};

/// Default number of emitted records between checkpoints
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Per-stream processing parameters
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Stream identity
    pub kind: StreamKind,
    /// Sub-type with its own bookmark
    pub sub_type: Option<String>,
    /// Field holding the bookmark value (dot path); `None` for full-table streams
    pub bookmark_field: Option<String>,
    /// Emitted records between checkpoints
    pub batch_size: usize,
    /// Starting bookmark when state has none
    pub start_date: Option<String>,
}

impl ProcessorConfig {
    /// Create a config for a stream kind
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            sub_type: None,
            bookmark_field: None,
            batch_size: DEFAULT_BATCH_SIZE,
            start_date: None,
        }
    }

    /// Set the sub-type
    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    /// Set the bookmark field
    #[must_use]
    pub fn with_bookmark_field(mut self, field: impl Into<String>) -> Self {
        self.bookmark_field = Some(field.into());
        self
    }

    /// Set the checkpoint batch size
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the start date
    #[must_use]
    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }
}

/// Statistics from processing one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Stream name
    pub stream: String,
    /// Records written to the sink
    pub emitted: usize,
    /// Records dropped because their key was already emitted
    pub duplicates_skipped: usize,
    /// Records dropped because they predate the starting bookmark
    pub stale_skipped: usize,
    /// Checkpoints written
    pub checkpoints: usize,
    /// Bookmark persisted at the end
    pub bookmark: Option<String>,
    /// Statistics reported by the fetch engine
    pub fetch: Option<FetchStats>,
}

/// Deduplicates records and advances the bookmark of one stream
#[derive(Debug, Clone)]
pub struct StreamProcessor {
    config: ProcessorConfig,
    state: StateManager,
}

/// Running bookmark bookkeeping for one `process` call
#[derive(Debug, Default)]
struct Progress {
    running_max: Option<BookmarkValue>,
    persisted: Option<BookmarkValue>,
}

impl StreamProcessor {
    /// Create a processor writing bookmarks through `state`
    pub fn new(config: ProcessorConfig, state: StateManager) -> Self {
        Self { config, state }
    }

    /// Stream name
    pub fn stream(&self) -> &str {
        self.config.kind.name()
    }

    /// Bookmark the sync starts from: the persisted one, else the start date
    pub async fn start_bookmark(&self) -> Option<String> {
        self.state
            .get_bookmark(self.stream(), self.config.sub_type.as_deref())
            .await
            .or_else(|| self.config.start_date.clone())
    }

    /// Drain `records` into `sink`
    ///
    /// On an engine failure the progress made so far is checkpointed before
    /// the error is returned.
    pub async fn process(
        &self,
        mut records: BufferedIterator,
        sink: &mut dyn RecordSink,
    ) -> Result<SyncStats> {
        let stream = self.stream().to_string();
        let dedup_key = self.config.kind.deduplication_key();
        let batch_size = self.config.batch_size.max(1);

        let start = self.start_bookmark().await.map(BookmarkValue::parse);
        let mut progress = Progress {
            running_max: None,
            persisted: self
                .state
                .get_bookmark(&stream, self.config.sub_type.as_deref())
                .await
                .map(BookmarkValue::parse),
        };
        let mut stats = SyncStats {
            stream: stream.clone(),
            ..SyncStats::default()
        };
        let mut seen: HashSet<String> = HashSet::new();

        info!(
            stream = %stream,
            sub_type = ?self.config.sub_type,
            start = ?start.as_ref().map(BookmarkValue::as_str),
            dedup_key = dedup_key.unwrap_or("<fingerprint>"),
            "Processing stream"
        );
        self.state.set_currently_syncing(Some(&stream)).await?;

        loop {
            let record = match records.next().await {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    error!(stream = %stream, error = %e, "Fetch failed, saving progress");
                    if let Err(checkpoint_err) =
                        self.checkpoint(&mut progress, sink, &mut stats).await
                    {
                        error!(stream = %stream, error = %checkpoint_err, "Checkpoint failed");
                    }
                    return Err(e);
                }
            };

            let key = dedup_value(&record, dedup_key)?;
            if seen.contains(&key) {
                trace!(stream = %stream, key = %key, "Skipping duplicate record");
                stats.duplicates_skipped += 1;
                continue;
            }

            let bookmark = self.bookmark_of(&record);
            if let (Some(value), Some(start)) = (&bookmark, &start) {
                if value < start {
                    stats.stale_skipped += 1;
                    continue;
                }
            }

            sink.write_record(&stream, &record).await?;
            seen.insert(key);
            stats.emitted += 1;

            if let Some(value) = bookmark {
                if progress.running_max.as_ref().map_or(true, |max| value > *max) {
                    progress.running_max = Some(value);
                }
            }

            if stats.emitted % batch_size == 0 {
                self.checkpoint(&mut progress, sink, &mut stats).await?;
            }
        }

        self.checkpoint(&mut progress, sink, &mut stats).await?;
        self.state.set_currently_syncing(None).await?;
        self.state.checkpoint().await?;
        sink.write_state(&self.state.snapshot().await).await?;
        sink.flush().await?;

        stats.bookmark = progress.persisted.map(|b| b.as_str().to_string());
        stats.fetch = records.fetch_stats().cloned();

        info!(
            stream = %stream,
            emitted = stats.emitted,
            duplicates = stats.duplicates_skipped,
            stale = stats.stale_skipped,
            bookmark = ?stats.bookmark,
            "Stream complete"
        );
        Ok(stats)
    }

    /// Advance the bookmark to the running maximum and persist it
    async fn checkpoint(
        &self,
        progress: &mut Progress,
        sink: &mut dyn RecordSink,
        stats: &mut SyncStats,
    ) -> Result<()> {
        if let Some(max) = &progress.running_max {
            if progress.persisted.as_ref().map_or(true, |persisted| max > persisted) {
                self.state
                    .set_bookmark(
                        self.stream(),
                        self.config.sub_type.as_deref(),
                        max.as_str().to_string(),
                    )
                    .await?;
                progress.persisted = Some(max.clone());
            }
        }

        self.state.checkpoint().await?;
        sink.write_state(&self.state.snapshot().await).await?;
        stats.checkpoints += 1;

        debug!(
            stream = %self.stream(),
            emitted = stats.emitted,
            bookmark = ?progress.persisted.as_ref().map(BookmarkValue::as_str),
            "Checkpoint"
        );
        Ok(())
    }

    fn bookmark_of(&self, record: &Record) -> Option<BookmarkValue> {
        let field = self.config.bookmark_field.as_deref()?;
        let mut current = record;
        for part in field.split('.') {
            current = current.get(part)?;
        }
        BookmarkValue::from_json(current)
    }
}

/// Value of the deduplication key; records without one are keyed by content
fn dedup_value(record: &Record, key: Option<&str>) -> Result<String> {
    match key.and_then(|key| record.get(key)) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(value) if !value.is_null() => Ok(value.to_string()),
        _ => Ok(format!("#{}", Fingerprint::of(record)?)),
    }
}
