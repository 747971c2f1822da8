//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{Catalog, StreamDefinition, TapConfig};
use crate::engine;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pool::RequestPool;
use crate::processor::{StreamProcessor, SyncStats};
use crate::sink::{JsonLinesSink, RecordSink};
use crate::state::StateManager;
use crate::template::TemplateContext;
use crate::transform::JsonTransformer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Sync { .. } => {
                let names = self.cli.command.stream_filter();
                let mut sink = JsonLinesSink::stdout();
                self.sync(&names, &mut sink).await.map(|_| ())
            }
            Commands::Validate => self.validate(),
            Commands::Streams => self.streams(),
        }
    }

    /// Load the tap config
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -C flag)"))?;
        TapConfig::from_file(path)
    }

    /// Load the stream catalog
    fn load_catalog(&self) -> Result<Catalog> {
        let path = self
            .cli
            .catalog
            .as_ref()
            .ok_or_else(|| Error::config("Catalog file not specified (use -c flag)"))?;
        Catalog::from_file(path)
    }

    /// Load state; checkpoints are written only at batch boundaries
    fn load_state(&self) -> Result<StateManager> {
        let manager = if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)?
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)?
        } else {
            StateManager::in_memory()
        };
        Ok(manager.auto_save(false))
    }

    /// Sync the selected streams into `sink`
    pub async fn sync(&self, names: &[String], sink: &mut dyn RecordSink) -> Result<Vec<SyncStats>> {
        let config = self.load_config()?;
        let catalog = self.load_catalog()?;
        let state = self.load_state()?;

        let resume_from = state.currently_syncing().await;
        let streams = catalog.selected(names, resume_from.as_deref())?;
        if let Some(current) = &resume_from {
            info!(stream = %current, "Resuming interrupted sync");
        }

        let started = Instant::now();
        let mut all_stats = Vec::with_capacity(streams.len());
        for stream in streams {
            all_stats.push(sync_stream(&config, stream, &state, sink).await?);
        }

        info!(
            streams = all_stats.len(),
            records = all_stats.iter().map(|s| s.emitted).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sync complete"
        );
        Ok(all_stats)
    }

    /// Validate config and catalog
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = self.load_catalog()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Config for {} is valid; catalog has {} streams",
                    config.base_url()?,
                    catalog.streams.len()
                )
            }
        }));
        Ok(())
    }

    /// List catalog streams
    fn streams(&self) -> Result<()> {
        let catalog = self.load_catalog()?;

        let streams: Vec<Value> = catalog
            .streams
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "sub_type": s.sub_type,
                    "method": s.method.to_string(),
                    "path": s.path,
                    "deduplication_key": s.kind().deduplication_key(),
                    "bookmark_field": s.bookmark_field,
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "STREAMS",
            "streams": streams
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Fetch one stream and feed it through the processor
async fn sync_stream(
    config: &TapConfig,
    stream: &StreamDefinition,
    state: &StateManager,
    sink: &mut dyn RecordSink,
) -> Result<SyncStats> {
    let kind = stream.kind();
    let client = HttpClient::with_config(config.http_client_config(&kind)?)?;
    let pool = RequestPool::new(Arc::new(client), config.max_workers);
    let processor = StreamProcessor::new(stream.processor_config(config), state.clone());

    let window = stream.window(config);
    let ctx = TemplateContext::new(config.template_values())
        .with_state(json!({ "bookmark": processor.start_bookmark().await }))
        .with_stream(stream.template_values(&window));
    let request = stream.request(&ctx)?;

    info!(
        stream = %stream.state_key(),
        path = %request.path,
        page_size = window.page_size,
        overlap = window.overlap_window,
        "Starting stream"
    );

    let records = engine::fetch(
        pool,
        Arc::new(JsonTransformer::new()),
        stream.context(),
        request,
        window,
    )?;
    processor.process(records, sink).await
}
