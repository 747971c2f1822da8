//! Output sinks
//!
//! The stream processor hands finalized records and state updates to a
//! `RecordSink`. `JsonLinesSink` writes one Singer-style message per line;
//! `MemorySink` keeps messages in memory.

use crate::error::{Error, Result};
use crate::state::State;
use crate::types::Record;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// A single finalized record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: Record,
        /// When the record was extracted (RFC 3339)
        time_extracted: String,
    },
    /// State update
    State {
        /// Full state document
        value: State,
    },
}

impl Message {
    /// Create a record message stamped with the current time
    pub fn record(stream: impl Into<String>, record: Record) -> Self {
        Self::record_at(stream, record, Utc::now())
    }

    /// Create a record message with an explicit extraction time
    pub fn record_at(stream: impl Into<String>, record: Record, at: DateTime<Utc>) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    /// Create a state message
    pub fn state(value: State) -> Self {
        Self::State { value }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}

/// Destination for finalized records and state
#[async_trait]
pub trait RecordSink: Send {
    /// Emit one record of `stream`
    async fn write_record(&mut self, stream: &str, record: &Record) -> Result<()>;

    /// Emit the current state
    async fn write_state(&mut self, state: &State) -> Result<()>;

    /// Flush buffered output
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON message per line
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Create a sink over any writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_message(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)
            .map_err(|e| Error::sink(format!("Failed to serialize message: {e}")))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| Error::sink(format!("Failed to write message: {e}")))
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    async fn write_record(&mut self, stream: &str, record: &Record) -> Result<()> {
        self.write_message(&Message::record(stream, record.clone()))
    }

    async fn write_state(&mut self, state: &State) -> Result<()> {
        self.write_message(&Message::state(state.clone()))?;
        // State lines are checkpoints for the consumer; don't leave them buffered.
        self.writer
            .flush()
            .map_err(|e| Error::sink(format!("Failed to flush output: {e}")))
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::sink(format!("Failed to flush output: {e}")))
    }
}

/// Collects messages in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Vec<Message>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in emission order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Records emitted for a stream
    pub fn records(&self, stream: &str) -> Vec<&Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// State messages in emission order
    pub fn states(&self) -> Vec<&State> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                Message::Record { .. } => None,
            })
            .collect()
    }

    /// Last emitted state
    pub fn last_state(&self) -> Option<&State> {
        self.states().pop()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write_record(&mut self, stream: &str, record: &Record) -> Result<()> {
        self.messages.push(Message::record(stream, record.clone()));
        Ok(())
    }

    async fn write_state(&mut self, state: &State) -> Result<()> {
        self.messages.push(Message::state(state.clone()));
        Ok(())
    }
}
