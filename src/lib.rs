#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! # overlap-tap
//!
//! Resumable, deduplicated extraction of offset-paginated APIs.
//!
//! Offset pagination over a collection that changes while it is being read
//! skips or repeats records. overlap-tap requests every page with a few
//! extra records so adjacent pages overlap, checks each page against the
//! records already known, and retries a whole batch of requests when the
//! overlap shows the collection shifted underneath.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use overlap_tap::config::{Catalog, TapConfig};
//! use overlap_tap::engine;
//! use overlap_tap::http::HttpClient;
//! use overlap_tap::pool::RequestPool;
//! use overlap_tap::processor::StreamProcessor;
//! use overlap_tap::sink::JsonLinesSink;
//! use overlap_tap::state::StateManager;
//! use overlap_tap::template::TemplateContext;
//! use overlap_tap::transform::JsonTransformer;
//! use std::sync::Arc;
//!
//! let config = TapConfig::from_file("config.json")?;
//! let catalog = Catalog::from_file("catalog/mambu.yaml")?;
//! let stream = catalog.get("clients")?;
//!
//! let client = HttpClient::with_config(config.http_client_config(&stream.kind())?)?;
//! let pool = RequestPool::new(Arc::new(client), config.max_workers);
//! let request = stream.request(&TemplateContext::new(config.template_values()))?;
//!
//! let records = engine::fetch(
//!     pool,
//!     Arc::new(JsonTransformer::new()),
//!     stream.context(),
//!     request,
//!     stream.window(&config),
//! )?;
//!
//! let processor = StreamProcessor::new(stream.processor_config(&config), StateManager::in_memory());
//! let stats = processor.process(records, &mut JsonLinesSink::stdout()).await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//!  RequestTemplate ──► OverlapFetcher ──► RequestPool ──► Transport (HttpClient)
//!                          │    ▲             │
//!                          │    └─ Page ◄─ RecordTransformer
//!                          ▼
//!                   BufferedIterator ──► StreamProcessor ──► RecordSink
//!                                              │
//!                                         StateManager
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP transport with retry and rate limiting
pub mod http;

/// Concurrent request pool
pub mod pool;

/// Raw response to record transformation and fingerprints
pub mod transform;

/// Overlapping-window fetch engine
pub mod engine;

/// Bounded buffer between engine and processor
pub mod buffer;

/// Deduplication and bookmarks
pub mod processor;

/// State management and checkpointing
pub mod state;

/// Output sinks
pub mod sink;

/// Configuration and stream catalog
pub mod config;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

pub use error::{Error, Result};
pub use types::*;

pub use engine::{fetch, FetchStats, OverlapFetcher, RequestTemplate, WindowConfig};
pub use processor::{StreamKind, StreamProcessor, SyncStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
