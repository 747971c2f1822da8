//! Overlapping-window fetch engine
//!
//! Fetches an offset-paginated endpoint concurrently while guarding against
//! records shifting between requests.
//!
//! # Overview
//!
//! Every request asks for `page_size + overlap_window` records while the
//! offset advances by `page_size`, so adjacent pages share their trailing
//! and leading records. A *cycle* dispatches as many requests as fit under
//! the batch limit, then awaits them in submission order and merges each
//! page's fingerprint set into the cycle's known set:
//!
//! - no shared record with the known set: drift, the cycle is cancelled
//!   and retried from its starting offset with exponential backoff
//! - a short overlap is logged as a warning
//! - an empty page ends the stream and cancels the remaining requests
//!
//! The last page of a cycle seeds the next cycle's known set, and its
//! records are never appended twice.
//!
//! - `OverlapFetcher` - owns the run loop for one stream
//! - `reconcile` - the overlap check on its own
//! - `WindowConfig` / `RequestTemplate` / `FetchStats`

mod reconcile;
mod types;

pub use reconcile::{reconcile, Reconciliation};
pub use types::{
    FetchStats, RequestTemplate, WindowConfig, DEFAULT_BATCH_LIMIT,
    DEFAULT_MAX_CORRECTION_ATTEMPTS, DEFAULT_OVERLAP_WINDOW, DEFAULT_PAGE_SIZE,
    MAX_CORRECTION_ATTEMPTS,
};

use crate::buffer::{record_buffer, BufferProducer, BufferedIterator};
use crate::error::{Error, Result};
use crate::pool::{cancel_all, RequestHandle, RequestPool};
use crate::transform::{Fingerprint, Page, RecordSet, RecordTransformer, StreamContext};
use crate::types::Record;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What one successful cycle produced
#[derive(Debug)]
struct CycleOutcome {
    /// Records not delivered before, in fetch order
    records: Vec<Record>,
    /// Fingerprints of the cycle's last non-empty page
    last_batch_set: RecordSet,
    /// Offset the next cycle starts at
    next_offset: u64,
    /// An empty page was seen
    end_of_stream: bool,
}

/// Concurrent fetcher for one stream
pub struct OverlapFetcher {
    pool: RequestPool,
    transformer: Arc<dyn RecordTransformer>,
    ctx: StreamContext,
    request: RequestTemplate,
    window: WindowConfig,
}

impl OverlapFetcher {
    /// Create a fetcher
    pub fn new(
        pool: RequestPool,
        transformer: Arc<dyn RecordTransformer>,
        ctx: StreamContext,
        request: RequestTemplate,
        window: WindowConfig,
    ) -> Result<Self> {
        window.validate()?;
        Ok(Self {
            pool,
            transformer,
            ctx,
            request,
            window,
        })
    }

    /// Start fetching in the background and return the consumer side.
    ///
    /// The buffer holds at most `batch_limit` records. A fetch failure is
    /// reported by the iterator once the records fetched before it have
    /// been drained.
    pub fn spawn(self) -> BufferedIterator {
        let (producer, mut iter) = record_buffer(self.window.batch_limit);
        let task = tokio::spawn(self.run(producer));
        iter.attach_producer(task);
        iter
    }

    /// Run cycles until the stream is exhausted, feeding `producer`
    pub async fn run(self, producer: BufferProducer) -> Result<FetchStats> {
        let mut stats = FetchStats::default();
        let mut offset = self.window.start_offset;
        let mut last_batch_set = RecordSet::new();

        info!(
            stream = %self.ctx.stream,
            sub_type = ?self.ctx.sub_type,
            page_size = self.window.page_size,
            overlap = self.window.overlap_window,
            workers = self.pool.workers(),
            "Starting overlapping fetch"
        );

        loop {
            if producer.is_consumer_gone() {
                debug!(stream = %self.ctx.stream, "Consumer dropped, stopping fetch");
                return Ok(stats);
            }

            let outcome = self
                .run_cycle_with_retry(offset, &last_batch_set, producer.buffered(), &mut stats)
                .await?;
            stats.cycles += 1;

            let fresh = outcome.records.len();
            debug!(
                stream = %self.ctx.stream,
                offset,
                next_offset = outcome.next_offset,
                fresh,
                "Cycle reconciled"
            );

            for record in outcome.records {
                if producer.push(record).await.is_err() {
                    debug!(stream = %self.ctx.stream, "Consumer dropped, stopping fetch");
                    return Ok(stats);
                }
                stats.records_delivered += 1;
            }

            if outcome.end_of_stream || fresh == 0 {
                info!(stream = %self.ctx.stream, offset = outcome.next_offset, "End of stream");
                break;
            }

            offset = outcome.next_offset;
            last_batch_set = outcome.last_batch_set;
        }

        info!(
            stream = %self.ctx.stream,
            records = stats.records_delivered,
            cycles = stats.cycles,
            requests = stats.requests_sent,
            "Fetch complete"
        );
        producer.finish();
        Ok(stats)
    }

    /// Run one cycle, retrying from the same offset while it fails to reconcile
    async fn run_cycle_with_retry(
        &self,
        offset: u64,
        last_batch_set: &RecordSet,
        buffered: usize,
        stats: &mut FetchStats,
    ) -> Result<CycleOutcome> {
        let max_attempts = self.window.max_correction_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.run_cycle(offset, last_batch_set, buffered, stats).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_cycle_retryable() => {
                    stats.correction_failures += 1;

                    if attempt >= max_attempts {
                        error!(
                            stream = %self.ctx.stream,
                            offset,
                            attempts = attempt,
                            error = %e,
                            "Giving up on cycle"
                        );
                        return Err(Error::CorrectionRetriesExhausted {
                            stream: self.ctx.stream.clone(),
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }

                    let delay = self.window.retry_delay(attempt);
                    info!(
                        stream = %self.ctx.stream,
                        offset,
                        attempt,
                        ?delay,
                        error = %e,
                        "Cycle failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Dispatch, await and reconcile one cycle starting at `start_offset`
    async fn run_cycle(
        &self,
        start_offset: u64,
        last_batch_set: &RecordSet,
        buffered: usize,
        stats: &mut FetchStats,
    ) -> Result<CycleOutcome> {
        let window_size = self.window.window_size();
        let page_size = self.window.page_size as u64;

        let mut handles: VecDeque<RequestHandle<Page>> = VecDeque::new();
        let mut next_offset = start_offset;
        while handles.is_empty()
            || buffered + handles.len() * window_size <= self.window.batch_limit
        {
            handles.push_back(self.submit(next_offset));
            next_offset += page_size;
        }
        stats.requests_sent += handles.len();
        debug!(
            stream = %self.ctx.stream,
            start_offset,
            requests = handles.len(),
            buffered,
            "Dispatched cycle"
        );

        let mut final_set = last_batch_set.clone();
        let mut records: HashMap<Fingerprint, Record> = HashMap::new();
        let mut last_page_set = RecordSet::new();
        let mut end_of_stream = false;

        while let Some(handle) = handles.pop_front() {
            let offset = handle.offset();

            let page = match handle.wait().await {
                Ok(page) => page,
                Err(e) => {
                    stats.requests_cancelled += cancel_all(handles).await.cancelled;
                    return Err(e);
                }
            };

            if page.is_empty() {
                debug!(stream = %self.ctx.stream, offset, "Empty page, end of stream");
                stats.requests_cancelled += cancel_all(handles.drain(..)).await.cancelled;
                end_of_stream = true;
                break;
            }

            let (page_set, page_records) = page.into_parts();
            let fetched = page_set.len();

            final_set = match reconcile(&final_set, &page_set, self.window.page_size) {
                Reconciliation::Merged(union) => union,
                Reconciliation::PartialOverlap { union, overlap } => {
                    stats.partial_overlaps += 1;
                    warn!(
                        stream = %self.ctx.stream,
                        offset,
                        overlap,
                        expected = self.window.overlap_window,
                        "Short overlap between pages, records may have shifted"
                    );
                    union
                }
                Reconciliation::Drifted => {
                    let known = final_set.len();
                    error!(
                        stream = %self.ctx.stream,
                        offset,
                        known,
                        fetched,
                        "Page shares no records with the previous window"
                    );
                    stats.requests_cancelled += cancel_all(handles).await.cancelled;
                    return Err(Error::Reconciliation {
                        stream: self.ctx.stream.clone(),
                        offset,
                        known,
                        fetched,
                    });
                }
            };

            stats.pages_fetched += 1;
            records.extend(page_records);
            last_page_set = page_set;
        }

        let records = final_set
            .difference(last_batch_set)
            .iter()
            .filter_map(|fingerprint| records.remove(fingerprint))
            .collect();

        Ok(CycleOutcome {
            records,
            last_batch_set: last_page_set,
            next_offset,
            end_of_stream,
        })
    }

    /// Submit the request for the window starting at `offset`
    fn submit(&self, offset: u64) -> RequestHandle<Page> {
        let request = self.request.page(offset, self.window.window_size());
        debug!(stream = %self.ctx.stream, offset, "Dispatching page request");
        let transformer = Arc::clone(&self.transformer);
        let ctx = self.ctx.clone();

        self.pool.submit_with(request, move |raw| {
            let records = transformer.transform(&raw, &ctx)?;
            Page::from_records(records)
        })
    }
}

impl std::fmt::Debug for OverlapFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlapFetcher")
            .field("stream", &self.ctx.stream)
            .field("request", &self.request)
            .field("window", &self.window)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// Fetch a stream and hand back its buffered iterator
pub fn fetch(
    pool: RequestPool,
    transformer: Arc<dyn RecordTransformer>,
    ctx: StreamContext,
    request: RequestTemplate,
    window: WindowConfig,
) -> Result<BufferedIterator> {
    Ok(OverlapFetcher::new(pool, transformer, ctx, request, window)?.spawn())
}

#[cfg(test)]
mod tests;
