//! Tests for the overlapping-window engine

use super::*;
use crate::http::{RawResponse, Transport};
use crate::transform::JsonTransformer;
use crate::types::{JsonValue, Method, StringMap};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use test_case::test_case;

// ============================================================================
// Reconciliation
// ============================================================================

fn set_of(ids: std::ops::Range<u64>) -> RecordSet {
    ids.map(|id| Fingerprint::of(&json!({ "id": id })).unwrap())
        .collect()
}

#[test_case(0..5, 5..10, 10, None; "disjoint pages drift")]
#[test_case(0..5, 2..7, 10, Some(7); "overlap of three")]
#[test_case(0..15, 10..25, 10, Some(25); "full window overlap")]
#[test_case(0..0, 0..15, 10, Some(15); "nothing known yet")]
#[test_case(0..15, 0..0, 10, Some(15); "empty page")]
fn test_reconcile_union(
    known: std::ops::Range<u64>,
    fetched: std::ops::Range<u64>,
    page: usize,
    expected: Option<usize>,
) {
    let union_len = reconcile(&set_of(known), &set_of(fetched), page)
        .into_union()
        .map(|union| union.len());
    assert_eq!(union_len, expected);
}

#[test]
fn test_reconcile_short_overlap_is_flagged() {
    // 10 known, 10 fetched, 1 shared: 10 + 5 < 19 < 20
    let result = reconcile(&set_of(0..10), &set_of(9..19), 5);
    match result {
        Reconciliation::PartialOverlap { union, overlap } => {
            assert_eq!(union.len(), 19);
            assert_eq!(overlap, 1);
        }
        other => panic!("expected partial overlap, got {other:?}"),
    }
}

#[test]
fn test_reconcile_keeps_fetch_order() {
    let union = reconcile(&set_of(0..3), &set_of(2..5), 10)
        .into_union()
        .unwrap();
    let expected = set_of(0..5);
    assert!(union.iter().eq(expected.iter()));
}

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_window_defaults() {
    let window = WindowConfig::default();
    assert_eq!(window.page_size, 500);
    assert_eq!(window.overlap_window, 20);
    assert_eq!(window.batch_limit, 10_000);
    assert_eq!(window.max_correction_attempts, 5);
    assert_eq!(window.window_size(), 520);
    assert!(window.validate().is_ok());
}

#[test_case(WindowConfig::new(0, 5); "zero page size")]
#[test_case(WindowConfig::new(10, 0); "zero overlap")]
#[test_case(WindowConfig::new(10, 5).with_batch_limit(0); "zero batch limit")]
#[test_case(WindowConfig::new(10, 5).with_retry(0, Duration::ZERO, Duration::ZERO); "zero attempts")]
#[test_case(WindowConfig::new(10, 5).with_retry(6, Duration::ZERO, Duration::ZERO); "more than five attempts")]
fn test_window_validation_rejects(window: WindowConfig) {
    assert!(matches!(
        window.validate(),
        Err(Error::InvalidConfigValue { .. })
    ));
}

#[test]
fn test_retry_delay_is_exponential() {
    let window = WindowConfig::default().with_retry(
        5,
        Duration::from_millis(100),
        Duration::from_millis(1000),
    );
    assert_eq!(window.retry_delay(1), Duration::from_millis(100));
    assert_eq!(window.retry_delay(2), Duration::from_millis(200));
    assert_eq!(window.retry_delay(3), Duration::from_millis(400));
    assert_eq!(window.retry_delay(10), Duration::from_millis(1000));
}

#[test]
fn test_request_template_page() {
    let template = RequestTemplate::new(Method::POST, "/loans:search")
        .param("detailsLevel", "FULL")
        .body(json!({"filterCriteria": []}));

    let request = template.page(1000, 520);
    assert_eq!(request.offset, 1000);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.params.get("offset").unwrap(), "1000");
    assert_eq!(request.params.get("limit").unwrap(), "520");
    assert_eq!(request.params.get("detailsLevel").unwrap(), "FULL");
    assert!(request.body.is_some());
}

// ============================================================================
// Engine runs against a simulated paged API
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start(u64),
    Completed(u64),
    Cancelled(u64),
}

/// Offset/limit API over an in-memory dataset
#[derive(Default)]
struct PagedTransport {
    records: Mutex<Vec<JsonValue>>,
    /// Offsets that return unrelated records, with how many times they do so
    drift: Mutex<HashMap<u64, usize>>,
    /// Offsets that answer with a JSON object instead of an array
    malformed: Mutex<HashMap<u64, usize>>,
    /// Offsets served from further into the dataset, as if records vanished
    shifted: Mutex<HashMap<u64, (usize, usize)>>,
    /// Offsets that fail at the transport level
    failing: HashSet<u64>,
    /// Delay for requests at or beyond this offset
    slow_from: Option<(u64, Duration)>,
    /// Record inserted at the front of the dataset after the first request
    insert_after_first: Mutex<Option<JsonValue>>,
    events: Mutex<Vec<Event>>,
    sent: AtomicUsize,
}

impl PagedTransport {
    fn with_records(count: u64) -> Self {
        let records = (0..count)
            .map(|id| json!({ "id": id, "displayName": format!("client-{id}") }))
            .collect();
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    fn drift_at(self, offset: u64, times: usize) -> Self {
        self.drift.lock().unwrap().insert(offset, times);
        self
    }

    fn malformed_at(self, offset: u64, times: usize) -> Self {
        self.malformed.lock().unwrap().insert(offset, times);
        self
    }

    fn shifted_at(self, offset: u64, by: usize, times: usize) -> Self {
        self.shifted.lock().unwrap().insert(offset, (by, times));
        self
    }

    fn failing_at(mut self, offset: u64) -> Self {
        self.failing.insert(offset);
        self
    }

    fn slow_from(mut self, offset: u64, delay: Duration) -> Self {
        self.slow_from = Some((offset, delay));
        self
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

/// Records the end of a request, including when its task is aborted
struct InFlight<'a> {
    events: &'a Mutex<Vec<Event>>,
    offset: u64,
    completed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let event = if self.completed {
            Event::Completed(self.offset)
        } else {
            Event::Cancelled(self.offset)
        };
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Transport for PagedTransport {
    async fn send(
        &self,
        _method: Method,
        _path: &str,
        params: &StringMap,
        _body: Option<&JsonValue>,
    ) -> Result<RawResponse> {
        let offset: u64 = params["offset"].parse().unwrap();
        let limit: usize = params["limit"].parse().unwrap();

        self.sent.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(Event::Start(offset));
        let mut guard = InFlight {
            events: &self.events,
            offset,
            completed: false,
        };

        if let Some((from, delay)) = self.slow_from {
            if offset >= from {
                tokio::time::sleep(delay).await;
            }
        }

        if self.failing.contains(&offset) {
            guard.completed = true;
            return Err(Error::http_status(500, "internal error"));
        }

        if take_one(&self.malformed, offset) {
            guard.completed = true;
            return Ok(RawResponse::json(&json!({ "not": "an array" })));
        }

        let drifted = take_one(&self.drift, offset);
        let shift = {
            let mut shifted = self.shifted.lock().unwrap();
            match shifted.get_mut(&offset) {
                Some((by, remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    *by
                }
                _ => 0,
            }
        };

        let page: Vec<JsonValue> = if drifted {
            (0..limit as u64)
                .map(|i| json!({ "id": 10_000 + offset + i }))
                .collect()
        } else {
            let mut records = self.records.lock().unwrap();
            let start = (offset as usize + shift).min(records.len());
            let end = (start + limit).min(records.len());
            let page = records[start..end].to_vec();

            if let Some(record) = self.insert_after_first.lock().unwrap().take() {
                records.insert(0, record);
            }
            page
        };

        guard.completed = true;
        Ok(RawResponse::json(&JsonValue::Array(page)))
    }
}

/// Consume one scripted occurrence for `offset`
fn take_one(scripted: &Mutex<HashMap<u64, usize>>, offset: u64) -> bool {
    let mut scripted = scripted.lock().unwrap();
    match scripted.get_mut(&offset) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

fn window(page_size: usize, overlap: usize, batch_limit: usize) -> WindowConfig {
    WindowConfig::new(page_size, overlap)
        .with_batch_limit(batch_limit)
        .with_retry(5, Duration::from_millis(1), Duration::from_millis(5))
}

fn fetcher(transport: &Arc<PagedTransport>, workers: usize, window: WindowConfig) -> OverlapFetcher {
    OverlapFetcher::new(
        RequestPool::new(transport.clone(), workers),
        Arc::new(JsonTransformer::new()),
        StreamContext::new("clients"),
        RequestTemplate::new(Method::GET, "/clients"),
        window,
    )
    .unwrap()
}

async fn drain(iter: &mut BufferedIterator) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    while let Some(record) = iter.next().await? {
        records.push(record);
    }
    Ok(records)
}

fn ids(records: &[Record]) -> Vec<u64> {
    records.iter().map(|r| r["id"].as_u64().unwrap()).collect()
}

/// Every request that started before a retry began had settled by then
fn assert_cycles_settled_before_retry(events: &[Event]) {
    let retries: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| **e == Event::Start(0))
        .map(|(i, _)| i)
        .skip(1)
        .collect();

    for boundary in retries {
        let before = &events[..boundary];
        let started = before.iter().filter(|e| matches!(e, Event::Start(_))).count();
        let settled = before
            .iter()
            .filter(|e| matches!(e, Event::Completed(_) | Event::Cancelled(_)))
            .count();
        assert_eq!(started, settled, "requests still running at retry: {before:?}");
    }
}

#[tokio::test]
async fn test_fetches_every_record_once() {
    let transport = Arc::new(PagedTransport::with_records(23));
    let mut iter = fetcher(&transport, 4, window(10, 5, 100)).spawn();

    let records = drain(&mut iter).await.unwrap();
    assert_eq!(ids(&records), (0..23).collect::<Vec<_>>());
    assert_eq!(records[0]["display_name"], "client-0");

    let stats = iter.fetch_stats().unwrap();
    assert_eq!(stats.records_delivered, 23);
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.correction_failures, 0);
    assert_eq!(stats.partial_overlaps, 0);
}

#[tokio::test]
async fn test_requests_use_overlapping_windows() {
    let transport = Arc::new(PagedTransport::with_records(23));
    let mut iter = fetcher(&transport, 1, window(10, 5, 100)).spawn();
    drain(&mut iter).await.unwrap();

    let starts: Vec<u64> = transport
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Start(offset) => Some(offset),
            _ => None,
        })
        .collect();

    // Seven windows fit under 100; the empty page at 30 cancels the rest.
    assert_eq!(starts[..4].to_vec(), vec![0, 10, 20, 30]);
    assert_eq!(iter.fetch_stats().unwrap().requests_sent, 7);
}

#[tokio::test]
async fn test_spans_multiple_cycles() {
    let transport = Arc::new(PagedTransport::with_records(95));
    let mut iter = fetcher(&transport, 3, window(10, 5, 30)).spawn();

    let records = drain(&mut iter).await.unwrap();
    assert_eq!(ids(&records), (0..95).collect::<Vec<_>>());

    let stats = iter.fetch_stats().unwrap();
    assert!(stats.cycles > 1);
    assert_eq!(stats.records_delivered, 95);
}

#[tokio::test]
async fn test_dataset_aligned_to_page_size() {
    let transport = Arc::new(PagedTransport::with_records(40));
    let mut iter = fetcher(&transport, 2, window(10, 2, 24)).spawn();

    let records = drain(&mut iter).await.unwrap();
    assert_eq!(ids(&records), (0..40).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_empty_stream() {
    let transport = Arc::new(PagedTransport::with_records(0));
    let mut iter = fetcher(&transport, 2, window(10, 5, 100)).spawn();

    assert!(drain(&mut iter).await.unwrap().is_empty());
    assert_eq!(iter.fetch_stats().unwrap().records_delivered, 0);
}

#[tokio::test]
async fn test_start_offset() {
    let transport = Arc::new(PagedTransport::with_records(30));
    let window = window(10, 5, 100).with_start_offset(20);
    let mut iter = fetcher(&transport, 2, window).spawn();

    let records = drain(&mut iter).await.unwrap();
    assert_eq!(ids(&records), (20..30).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_drift_is_retried_from_cycle_start() {
    let transport = Arc::new(
        PagedTransport::with_records(45)
            .drift_at(10, 2)
            .slow_from(20, Duration::from_millis(30)),
    );
    let mut iter = fetcher(&transport, 5, window(10, 5, 60)).spawn();

    let records = drain(&mut iter).await.unwrap();
    assert_eq!(ids(&records), (0..45).collect::<Vec<_>>());

    let stats = iter.fetch_stats().unwrap();
    assert_eq!(stats.correction_failures, 2);
    assert!(stats.requests_cancelled > 0);

    let events = transport.events();
    let attempts = events.iter().filter(|e| **e == Event::Start(0)).count();
    assert_eq!(attempts, 3);
    assert!(events.iter().any(|e| matches!(e, Event::Cancelled(_))));
    assert_cycles_settled_before_retry(&events);
}

#[tokio::test]
async fn test_drift_exhausts_retries() {
    let transport = Arc::new(PagedTransport::with_records(45).drift_at(10, usize::MAX));
    let window = window(10, 5, 60).with_retry(3, Duration::from_millis(1), Duration::from_millis(2));
    let mut iter = fetcher(&transport, 5, window).spawn();

    let err = drain(&mut iter).await.unwrap_err();
    match err {
        Error::CorrectionRetriesExhausted {
            stream,
            attempts,
            source,
        } => {
            assert_eq!(stream, "clients");
            assert_eq!(attempts, 3);
            assert!(matches!(
                *source,
                Error::Reconciliation { offset: 10, .. }
            ));
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }

    assert_cycles_settled_before_retry(&transport.events());
    assert!(iter.is_finished());
}

#[tokio::test]
async fn test_malformed_page_is_retried_from_cycle_start() {
    let transport = Arc::new(PagedTransport::with_records(23).malformed_at(10, 2));
    let mut iter = fetcher(&transport, 4, window(10, 5, 100)).spawn();

    let records = drain(&mut iter).await.unwrap();
    assert_eq!(ids(&records), (0..23).collect::<Vec<_>>());

    let stats = iter.fetch_stats().unwrap();
    assert_eq!(stats.correction_failures, 2);
    assert_eq!(stats.records_delivered, 23);

    let events = transport.events();
    let attempts = events.iter().filter(|e| **e == Event::Start(0)).count();
    assert_eq!(attempts, 3);
    assert_cycles_settled_before_retry(&events);
}

#[tokio::test]
async fn test_malformed_page_exhausts_retries() {
    let transport = Arc::new(PagedTransport::with_records(23).malformed_at(10, usize::MAX));
    let window = window(10, 5, 100).with_retry(2, Duration::from_millis(1), Duration::from_millis(2));
    let mut iter = fetcher(&transport, 4, window).spawn();

    let err = drain(&mut iter).await.unwrap_err();
    match err {
        Error::CorrectionRetriesExhausted { attempts, source, .. } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*source, Error::UnexpectedShape { .. }));
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

#[tokio::test]
async fn test_short_overlap_is_counted_not_retried() {
    // Offset 10 answers with records 14..29: one record shared with 0..15.
    let transport = Arc::new(PagedTransport::with_records(45).shifted_at(10, 4, 1));
    let mut iter = fetcher(&transport, 4, window(10, 5, 100)).spawn();

    let records = drain(&mut iter).await.unwrap();
    assert_eq!(ids(&records), (0..45).collect::<Vec<_>>());

    let stats = iter.fetch_stats().unwrap();
    assert_eq!(stats.partial_overlaps, 1);
    assert_eq!(stats.correction_failures, 0);
    assert_eq!(stats.cycles, 1);
}

#[tokio::test]
async fn test_insert_during_fetch_delivers_each_record_once() {
    let transport = Arc::new(PagedTransport::with_records(30));
    *transport.insert_after_first.lock().unwrap() = Some(json!({ "id": 999 }));

    let mut iter = fetcher(&transport, 1, window(10, 5, 100)).spawn();
    let records = drain(&mut iter).await.unwrap();

    let delivered = ids(&records);
    let unique: HashSet<u64> = delivered.iter().copied().collect();
    assert_eq!(unique.len(), delivered.len());
    assert!((0..30).all(|id| unique.contains(&id)));
    assert_eq!(iter.fetch_stats().unwrap().partial_overlaps, 0);
}

#[tokio::test]
async fn test_transport_error_is_fatal() {
    let transport = Arc::new(
        PagedTransport::with_records(100)
            .failing_at(10)
            .slow_from(20, Duration::from_millis(30)),
    );
    let mut iter = fetcher(&transport, 4, window(10, 5, 60)).spawn();

    let err = drain(&mut iter).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));

    // No cycle retry for transport failures.
    let attempts = transport
        .events()
        .iter()
        .filter(|e| **e == Event::Start(0))
        .count();
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn test_stops_when_consumer_is_gone() {
    let transport = Arc::new(PagedTransport::with_records(50));
    let (producer, iter) = crate::buffer::record_buffer(10);
    drop(iter);

    let stats = fetcher(&transport, 2, window(10, 5, 10))
        .run(producer)
        .await
        .unwrap();

    assert_eq!(stats.records_delivered, 0);
    assert_eq!(transport.sent(), 0);
}

#[tokio::test]
async fn test_fetch_rejects_invalid_window() {
    let transport = Arc::new(PagedTransport::with_records(1));
    let result = fetch(
        RequestPool::new(transport, 1),
        Arc::new(JsonTransformer::new()),
        StreamContext::new("clients"),
        RequestTemplate::new(Method::GET, "/clients"),
        WindowConfig::new(10, 0),
    );
    assert!(result.is_err());
}
