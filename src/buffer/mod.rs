//! Buffered iterator between the fetch engine and the stream processor
//!
//! A bounded FIFO channel with one producer (the engine task) and one
//! consumer. The producer signals end-of-stream by finishing; if the
//! producer task is attached, its outcome is reported once every record it
//! produced has been drained.

use crate::engine::FetchStats;
use crate::error::{Error, Result};
use crate::types::Record;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Create a buffer holding at most `capacity` records (at least one)
pub fn record_buffer(capacity: usize) -> (BufferProducer, BufferedIterator) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        BufferProducer { tx },
        BufferedIterator {
            rx,
            producer: None,
            fetch_stats: None,
            finished: false,
            delivered: 0,
        },
    )
}

/// Returned when the consumer has gone away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerGone;

/// Producer half of the buffer
#[derive(Debug)]
pub struct BufferProducer {
    tx: mpsc::Sender<Record>,
}

impl BufferProducer {
    /// Append a record, waiting while the buffer is full
    pub async fn push(&self, record: Record) -> std::result::Result<(), ConsumerGone> {
        self.tx.send(record).await.map_err(|_| ConsumerGone)
    }

    /// Records appended but not yet consumed
    pub fn buffered(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Whether the consumer dropped its half
    pub fn is_consumer_gone(&self) -> bool {
        self.tx.is_closed()
    }

    /// Signal end-of-stream
    pub fn finish(self) {
        drop(self);
    }
}

/// Consumer half of the buffer
#[derive(Debug)]
pub struct BufferedIterator {
    rx: mpsc::Receiver<Record>,
    producer: Option<JoinHandle<Result<FetchStats>>>,
    fetch_stats: Option<FetchStats>,
    finished: bool,
    delivered: usize,
}

impl BufferedIterator {
    /// Attach the task that feeds this buffer so its failure is surfaced
    pub fn attach_producer(&mut self, task: JoinHandle<Result<FetchStats>>) {
        self.producer = Some(task);
    }

    /// Next record in FIFO order
    ///
    /// Waits while the buffer is empty and the producer is still running.
    /// Returns `Ok(None)` once the producer finished and the buffer is
    /// drained; a producer failure is returned as `Err` at that point
    /// instead. The iterator is fused afterwards.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        if self.finished {
            return Ok(None);
        }

        if let Some(record) = self.rx.recv().await {
            self.delivered += 1;
            return Ok(Some(record));
        }

        self.finished = true;
        let Some(task) = self.producer.take() else {
            debug!(delivered = self.delivered, "Buffer exhausted");
            return Ok(None);
        };

        match task.await {
            Ok(Ok(stats)) => {
                debug!(delivered = self.delivered, "Buffer exhausted");
                self.fetch_stats = Some(stats);
                Ok(None)
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(Error::Worker {
                message: format!("fetch task failed: {e}"),
            }),
        }
    }

    /// Records waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Whether exhaustion (or a producer failure) has been reported
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of records handed to the consumer
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Statistics of the producer, once it finished successfully
    pub fn fetch_stats(&self) -> Option<&FetchStats> {
        self.fetch_stats.as_ref()
    }

    /// Adapt into a `Stream` of records
    pub fn into_stream(self) -> impl Stream<Item = Result<Record>> {
        futures::stream::unfold(self, |mut iter| async move {
            match iter.next().await {
                Ok(Some(record)) => Some((Ok(record), iter)),
                Ok(None) => None,
                Err(e) => Some((Err(e), iter)),
            }
        })
    }
}
