//! Concurrent request pool
//!
//! A fixed number of worker permits shared by every page request of a
//! stream. Submitting a request spawns a task that waits for a permit
//! (queued), sends the request through the transport (in flight), and
//! optionally post-processes the body on the same worker.
//!
//! # Overview
//!
//! - `RequestPool::submit` / `submit_with` return a `RequestHandle`
//! - `RequestHandle::cancel` aborts a queued or in-flight request and waits
//!   for the task to settle; cancelling a finished request is a no-op
//! - `cancel_all` does the same for a whole set of handles

use crate::error::{Error, Result};
use crate::http::{RawResponse, Transport};
use crate::types::{JsonValue, Method, StringMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 8;

/// A single page request
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// HTTP method
    pub method: Method,
    /// Endpoint path (relative to the transport's base URL)
    pub path: String,
    /// Query parameters, including pagination
    pub params: StringMap,
    /// JSON body
    pub body: Option<JsonValue>,
    /// Offset this request starts at
    pub offset: u64,
}

/// How a request ended once its handle was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request finished before cancellation took effect
    Completed,
    /// The request was stopped while queued or in flight
    Cancelled,
}

/// Counts returned by [`cancel_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelSummary {
    /// Requests that had already completed
    pub completed: usize,
    /// Requests that were stopped
    pub cancelled: usize,
}

/// Handle to a submitted request
#[derive(Debug)]
pub struct RequestHandle<T = RawResponse> {
    offset: u64,
    task: JoinHandle<Result<T>>,
}

impl<T> RequestHandle<T> {
    /// Offset of the underlying request
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the task has finished (completed, failed or cancelled)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the request's result
    pub async fn wait(self) -> Result<T> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::Worker {
                message: format!("request at offset {} panicked: {e}", self.offset),
            }),
        }
    }

    /// Cancel the request and wait until it reports completed or cancelled
    pub async fn cancel(self) -> RequestOutcome {
        self.task.abort();
        match self.task.await {
            Err(e) if e.is_cancelled() => RequestOutcome::Cancelled,
            _ => RequestOutcome::Completed,
        }
    }
}

/// Cancel every handle and wait for all of them to settle
pub async fn cancel_all<T, I>(handles: I) -> CancelSummary
where
    I: IntoIterator<Item = RequestHandle<T>>,
{
    let handles: Vec<_> = handles.into_iter().collect();

    // Abort everything first so queued requests never grab a freed permit.
    for handle in &handles {
        handle.task.abort();
    }

    let mut summary = CancelSummary::default();
    for handle in handles {
        match handle.cancel().await {
            RequestOutcome::Completed => summary.completed += 1,
            RequestOutcome::Cancelled => summary.cancelled += 1,
        }
    }

    debug!(
        completed = summary.completed,
        cancelled = summary.cancelled,
        "Cancelled outstanding requests"
    );
    summary
}

/// Bounded pool of request workers
#[derive(Clone)]
pub struct RequestPool {
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl RequestPool {
    /// Create a pool with the given number of workers (at least one)
    pub fn new(transport: Arc<dyn Transport>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            transport,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of requests currently holding a worker
    pub fn busy_workers(&self) -> usize {
        self.workers - self.permits.available_permits()
    }

    /// Submit a request, returning its raw response
    pub fn submit(&self, request: PageRequest) -> RequestHandle<RawResponse> {
        self.submit_with(request, Ok)
    }

    /// Submit a request and post-process its response on the worker
    pub fn submit_with<T, F>(&self, request: PageRequest, process: F) -> RequestHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(RawResponse) -> Result<T> + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        let permits = Arc::clone(&self.permits);
        let offset = request.offset;

        let task = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.map_err(|_| Error::Cancelled)?;
            trace!(offset = request.offset, path = %request.path, "Sending page request");

            let response = transport
                .send(
                    request.method,
                    &request.path,
                    &request.params,
                    request.body.as_ref(),
                )
                .await?;

            process(response)
        });

        RequestHandle { offset, task }
    }
}

impl std::fmt::Debug for RequestPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPool")
            .field("workers", &self.workers)
            .field("busy_workers", &self.busy_workers())
            .finish_non_exhaustive()
    }
}
