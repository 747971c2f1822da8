//! Configuration types
//!
//! Two documents drive a sync:
//! - `TapConfig` - the JSON config file (tenant, credentials, window sizes)
//! - `Catalog` - the YAML stream definitions (endpoint, params, body,
//!   bookmark field, per-stream window overrides)

use crate::engine::{
    RequestTemplate, WindowConfig, DEFAULT_BATCH_LIMIT, DEFAULT_MAX_CORRECTION_ATTEMPTS,
    DEFAULT_OVERLAP_WINDOW, DEFAULT_PAGE_SIZE,
};
use crate::error::{Error, Result};
use crate::http::{Credentials, HttpClientConfig, RateLimiterConfig};
use crate::processor::{BookmarkValue, ProcessorConfig, StreamKind, DEFAULT_BATCH_SIZE};
use crate::template::{self, TemplateContext};
use crate::transform::{validate_record_path, StreamContext};
use crate::types::{BackoffType, JsonValue, Method, OptionStringExt, StringMap};
use chrono::SecondsFormat;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Tap Config
// ============================================================================

/// Tap configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Tenant subdomain; the API lives at `https://{subdomain}.mambu.com/api`
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Explicit API base URL, overriding `subdomain`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bookmark used for streams without state
    pub start_date: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Basic auth username
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// API key, used instead of basic auth when present
    #[serde(default)]
    pub apikey: Option<String>,

    /// API key for the audit trail stream
    #[serde(default)]
    pub apikey_audit: Option<String>,

    /// Logical page size
    #[serde(default = "default_page_size", deserialize_with = "lenient_usize")]
    pub page_size: usize,

    /// Records requested beyond each page
    #[serde(default = "default_overlap_window", deserialize_with = "lenient_usize")]
    pub overlap_window: usize,

    /// Ceiling on buffered plus in-flight records
    #[serde(default = "default_batch_limit", deserialize_with = "lenient_usize")]
    pub batch_limit: usize,

    /// Concurrent page requests
    #[serde(default = "default_max_workers", deserialize_with = "lenient_usize")]
    pub max_workers: usize,

    /// Attempts per fetch cycle before giving up on reconciliation
    #[serde(default = "default_max_correction_attempts")]
    pub max_correction_attempts: u32,

    /// Delay before the first cycle retry, in milliseconds
    #[serde(default = "default_correction_backoff_ms")]
    pub correction_backoff_ms: u64,

    /// Emitted records between state checkpoints
    #[serde(default = "default_batch_size", deserialize_with = "lenient_usize")]
    pub batch_size: usize,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_overlap_window() -> usize {
    DEFAULT_OVERLAP_WINDOW
}

fn default_batch_limit() -> usize {
    DEFAULT_BATCH_LIMIT
}

fn default_max_workers() -> usize {
    8
}

fn default_max_correction_attempts() -> u32 {
    DEFAULT_MAX_CORRECTION_ATTEMPTS
}

fn default_correction_backoff_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Accepts `500` as well as `"500"`
fn lenient_usize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(usize),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl TapConfig {
    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Check required keys and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.subdomain.clone().none_if_empty().is_none()
            && self.base_url.clone().none_if_empty().is_none()
        {
            return Err(Error::missing_field("subdomain"));
        }
        if self.start_date.trim().is_empty() {
            return Err(Error::missing_field("start_date"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::missing_field("user_agent"));
        }
        if BookmarkValue::parse(self.start_date.as_str()).instant().is_none() {
            return Err(Error::invalid_value(
                "start_date",
                format!("'{}' is not a date or timestamp", self.start_date),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(Error::config(
                "username and password must be given together",
            ));
        }
        url::Url::parse(&self.base_url()?)?;
        if self.max_workers == 0 {
            return Err(Error::invalid_value("max_workers", "must be at least 1"));
        }
        self.window_config().validate()
    }

    /// API base URL
    pub fn base_url(&self) -> Result<String> {
        if let Some(url) = self.base_url.clone().none_if_empty() {
            return Ok(url.trim_end_matches('/').to_string());
        }
        match self.subdomain.clone().none_if_empty() {
            Some(subdomain) => Ok(format!("https://{subdomain}.mambu.com/api")),
            None => Err(Error::missing_field("subdomain")),
        }
    }

    /// Start date as an RFC 3339 UTC timestamp
    pub fn start_bookmark(&self) -> String {
        BookmarkValue::parse(self.start_date.as_str())
            .instant()
            .map_or_else(
                || self.start_date.clone(),
                |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
    }

    /// Credentials for a stream; the audit trail has its own API key
    pub fn credentials(&self, kind: &StreamKind) -> Credentials {
        if *kind == StreamKind::AuditTrail {
            if let Some(key) = self.apikey_audit.clone().none_if_empty() {
                return Credentials::ApiKey { key };
            }
        }
        if let Some(key) = self.apikey.clone().none_if_empty() {
            return Credentials::ApiKey { key };
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Credentials::None,
        }
    }

    /// HTTP client settings for a stream
    pub fn http_client_config(&self, kind: &StreamKind) -> Result<HttpClientConfig> {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.base_url()?)
            .user_agent(self.user_agent.clone())
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.retry_backoff.backoff_type,
                Duration::from_millis(self.http.retry_backoff.initial_ms),
                Duration::from_millis(self.http.retry_backoff.max_ms),
            )
            .header("Accept", "application/vnd.mambu.v2+json")
            .credentials(self.credentials(kind));

        builder = if self.http.rate_limit.requests_per_second == 0 {
            builder.no_rate_limit()
        } else {
            builder.rate_limit(RateLimiterConfig::for_workers(
                self.http.rate_limit.requests_per_second,
                self.max_workers,
            ))
        };

        Ok(builder.build())
    }

    /// Window parameters shared by every stream
    pub fn window_config(&self) -> WindowConfig {
        let initial = Duration::from_millis(self.correction_backoff_ms);
        let defaults = WindowConfig::default();
        WindowConfig::new(self.page_size, self.overlap_window)
            .with_batch_limit(self.batch_limit)
            .with_retry(
                self.max_correction_attempts,
                initial,
                defaults.max_backoff.max(initial),
            )
    }

    /// Values exposed as `{{ config.* }}` in templates
    ///
    /// Credentials are left out.
    pub fn template_values(&self) -> JsonValue {
        serde_json::json!({
            "subdomain": self.subdomain,
            "base_url": self.base_url().ok(),
            "start_date": self.start_bookmark(),
            "user_agent": self.user_agent,
            "page_size": self.page_size,
        })
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    5
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    60000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second limit; 0 disables limiting
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
        }
    }
}

fn default_rps() -> u32 {
    10
}

// ============================================================================
// Catalog
// ============================================================================

/// Stream definitions loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Streams in sync order
    #[serde(default)]
    pub streams: Vec<StreamDefinition>,
}

impl Catalog {
    /// Parse a catalog from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let catalog: Self = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Check stream names and templates
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for stream in &self.streams {
            stream.validate()?;
            if !seen.insert(stream.state_key()) {
                return Err(Error::config(format!(
                    "stream '{}' is defined twice",
                    stream.state_key()
                )));
            }
        }
        Ok(())
    }

    /// Look up a stream by name
    pub fn get(&self, name: &str) -> Result<&StreamDefinition> {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::StreamNotFound {
                stream: name.to_string(),
            })
    }

    /// Streams to sync; every stream when `names` is empty
    ///
    /// Sync resumes at `resume_from` (the interrupted stream) when it is
    /// among the selected streams.
    pub fn selected(&self, names: &[String], resume_from: Option<&str>) -> Result<Vec<&StreamDefinition>> {
        let mut selected: Vec<&StreamDefinition> = if names.is_empty() {
            self.streams.iter().collect()
        } else {
            for name in names {
                self.get(name)?;
            }
            self.streams
                .iter()
                .filter(|s| names.contains(&s.name))
                .collect()
        };

        if let Some(current) = resume_from {
            if let Some(pos) = selected.iter().position(|s| s.name == current) {
                selected.rotate_left(pos);
            }
        }
        Ok(selected)
    }
}

/// One stream of the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDefinition {
    /// Stream name; fixes the deduplication key
    pub name: String,

    /// Endpoint path relative to the base URL (may contain templates)
    pub path: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Static query parameters (may contain templates)
    #[serde(default)]
    pub params: StringMap,

    /// JSON body for search endpoints (may contain templates)
    #[serde(default)]
    pub body: Option<JsonValue>,

    /// JSONPath to the record array; the body itself when absent
    #[serde(default)]
    pub record_path: Option<String>,

    /// Record field holding the bookmark (snake_case, dot path)
    #[serde(default)]
    pub bookmark_field: Option<String>,

    /// Sub-type with its own bookmark
    #[serde(default)]
    pub sub_type: Option<String>,

    /// Query parameter carrying the offset
    #[serde(default = "default_offset_param")]
    pub offset_param: String,

    /// Query parameter carrying the limit
    #[serde(default = "default_limit_param")]
    pub limit_param: String,

    /// Page size override
    #[serde(default)]
    pub page_size: Option<usize>,

    /// Overlap override
    #[serde(default)]
    pub overlap_window: Option<usize>,

    /// Batch limit override
    #[serde(default)]
    pub batch_limit: Option<usize>,
}

fn default_offset_param() -> String {
    "offset".to_string()
}

fn default_limit_param() -> String {
    "limit".to_string()
}

impl StreamDefinition {
    /// Stream kind
    pub fn kind(&self) -> StreamKind {
        StreamKind::from_name(&self.name)
    }

    /// Key identifying the stream in state and log output
    pub fn state_key(&self) -> String {
        match &self.sub_type {
            Some(sub_type) => format!("{}/{sub_type}", self.name),
            None => self.name.clone(),
        }
    }

    /// Check required fields and template roots
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("streams[].name"));
        }
        if self.path.trim().is_empty() {
            return Err(Error::invalid_value(
                format!("{}.path", self.name),
                "must not be empty",
            ));
        }

        let templated = serde_json::json!({
            "path": self.path,
            "params": self.params,
            "body": self.body,
        });
        let unknown = template::unknown_roots(&templated);
        if !unknown.is_empty() {
            return Err(Error::template(format!(
                "stream '{}' references unknown variables: {}",
                self.name,
                unknown.join(", ")
            )));
        }
        if let Some(path) = &self.record_path {
            validate_record_path(path)?;
        }
        Ok(())
    }

    /// Window parameters with this stream's overrides applied
    pub fn window(&self, config: &TapConfig) -> WindowConfig {
        let mut window = config.window_config();
        if let Some(page_size) = self.page_size {
            window.page_size = page_size;
        }
        if let Some(overlap) = self.overlap_window {
            window.overlap_window = overlap;
        }
        if let Some(batch_limit) = self.batch_limit {
            window.batch_limit = batch_limit;
        }
        window
    }

    /// Transformer context
    pub fn context(&self) -> StreamContext {
        let mut ctx = StreamContext::new(&self.name);
        ctx.sub_type.clone_from(&self.sub_type);
        ctx.record_path.clone_from(&self.record_path);
        ctx
    }

    /// Values exposed as `{{ stream.* }}` in templates
    pub fn template_values(&self, window: &WindowConfig) -> JsonValue {
        serde_json::json!({
            "name": self.name,
            "sub_type": self.sub_type,
            "page_size": window.page_size,
            "overlap_window": window.overlap_window,
        })
    }

    /// Render the request template
    pub fn request(&self, ctx: &TemplateContext) -> Result<RequestTemplate> {
        let mut request = RequestTemplate::new(self.method, template::render(&self.path, ctx)?);
        for (key, value) in &self.params {
            request = request.param(key.clone(), template::render(value, ctx)?);
        }
        if let Some(body) = &self.body {
            request = request.body(template::render_value(body, ctx)?);
        }
        request.offset_param.clone_from(&self.offset_param);
        request.limit_param.clone_from(&self.limit_param);
        Ok(request)
    }

    /// Processor settings
    pub fn processor_config(&self, config: &TapConfig) -> ProcessorConfig {
        let mut processor = ProcessorConfig::new(self.kind())
            .with_batch_size(config.batch_size)
            .with_start_date(config.start_bookmark());
        processor.sub_type.clone_from(&self.sub_type);
        processor.bookmark_field.clone_from(&self.bookmark_field);
        processor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CATALOG: &str = include_str!("../catalog/mambu.yaml");

    fn minimal_config() -> TapConfig {
        TapConfig::from_json(
            r#"{
                "subdomain": "acme",
                "start_date": "2024-01-01",
                "user_agent": "tap-test <ops@example.com>",
                "username": "reader",
                "password": "secret"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = minimal_config();
        assert_eq!(config.base_url().unwrap(), "https://acme.mambu.com/api");
        assert_eq!(config.page_size, 500);
        assert_eq!(config.overlap_window, 20);
        assert_eq!(config.batch_limit, 10_000);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.start_bookmark(), "2024-01-01T00:00:00Z");
        assert!(matches!(
            config.credentials(&StreamKind::Clients),
            Credentials::Basic { .. }
        ));
    }

    #[test]
    fn test_page_size_as_string() {
        let config = TapConfig::from_json(
            r#"{
                "base_url": "http://localhost:8080/api/",
                "start_date": "2024-01-01T00:00:00Z",
                "user_agent": "tap-test",
                "page_size": "200"
            }"#,
        )
        .unwrap();
        assert_eq!(config.page_size, 200);
        assert_eq!(config.base_url().unwrap(), "http://localhost:8080/api");
        assert_eq!(config.window_config().window_size(), 220);
    }

    #[test]
    fn test_missing_required_keys() {
        let err = TapConfig::from_json(r#"{"start_date": "2024-01-01", "user_agent": "x"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == "subdomain"));

        let err = TapConfig::from_json(r#"{"subdomain": "acme", "start_date": "2024-01-01"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::JsonParse(_)));

        let err = TapConfig::from_json(
            r#"{"subdomain": "acme", "start_date": "yesterday", "user_agent": "x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = TapConfig::from_json(
            r#"{"base_url": "not a url", "start_date": "2024-01-01", "user_agent": "x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_zero_overlap_rejected() {
        let err = TapConfig::from_json(
            r#"{"subdomain": "acme", "start_date": "2024-01-01", "user_agent": "x", "overlap_window": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "overlap_window"));
    }

    #[test]
    fn test_audit_trail_api_key() {
        let mut config = minimal_config();
        config.apikey_audit = Some("audit-key".to_string());

        assert!(matches!(
            config.credentials(&StreamKind::AuditTrail),
            Credentials::ApiKey { ref key } if key == "audit-key"
        ));
        assert!(matches!(
            config.credentials(&StreamKind::Clients),
            Credentials::Basic { .. }
        ));
    }

    #[test]
    fn test_http_client_config() {
        let config = minimal_config();
        let http = config.http_client_config(&StreamKind::Clients).unwrap();
        assert_eq!(http.base_url.as_deref(), Some("https://acme.mambu.com/api"));
        assert_eq!(http.user_agent, "tap-test <ops@example.com>");
        assert_eq!(http.timeout, Duration::from_secs(300));
        assert_eq!(http.rate_limit.map(|r| r.burst_size), Some(8));
    }

    #[test]
    fn test_default_http_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout_seconds, 300);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.rate_limit.requests_per_second, 10);
    }

    #[test]
    fn test_parse_stream_definition() {
        let yaml = r#"
name: loan_transactions
path: "/loans/transactions:search"
method: POST
params:
  detailsLevel: FULL
  paginationDetails: "OFF"
body:
  sortingCriteria:
    field: creationDate
    order: ASC
  filterCriteria:
    - field: creationDate
      operator: AFTER
      value: "{{ state.bookmark }}"
bookmark_field: creation_date
page_size: 100
"#;

        let stream: StreamDefinition = serde_yaml::from_str(yaml).unwrap();
        stream.validate().unwrap();
        assert_eq!(stream.kind(), StreamKind::LoanTransactions);
        assert_eq!(stream.method, Method::POST);
        assert_eq!(stream.offset_param, "offset");

        let ctx = TemplateContext::default().with_state(json!({"bookmark": "2024-03-01T00:00:00Z"}));
        let request = stream.request(&ctx).unwrap();
        assert_eq!(request.path, "/loans/transactions:search");
        assert_eq!(request.params.get("detailsLevel").map(String::as_str), Some("FULL"));
        assert_eq!(
            request.body.unwrap()["filterCriteria"][0]["value"],
            "2024-03-01T00:00:00Z"
        );

        let window = stream.window(&minimal_config());
        assert_eq!(window.page_size, 100);
        assert_eq!(window.overlap_window, 20);
    }

    #[test]
    fn test_unknown_template_root_rejected() {
        let yaml = r#"
name: clients
path: "/clients"
params:
  since: "{{ bookmark }}"
"#;
        let stream: StreamDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(stream.validate(), Err(Error::Template { .. })));
    }

    #[test]
    fn test_invalid_record_path_rejected() {
        let yaml = r#"
name: cards
path: "/cards"
record_path: "$.data[*"
"#;
        let stream: StreamDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            stream.validate(),
            Err(Error::RecordExtraction { ref path, .. }) if path == "$.data[*"
        ));
    }

    #[test]
    fn test_bundled_catalog() {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();
        assert!(catalog.streams.len() >= 10);

        let clients = catalog.get("clients").unwrap();
        assert_eq!(clients.kind().deduplication_key(), Some("id"));
        assert_eq!(clients.bookmark_field.as_deref(), Some("last_modified_date"));

        let gl = catalog.get("gl_accounts").unwrap();
        assert_eq!(gl.kind().deduplication_key(), Some("gl_code"));

        assert!(matches!(
            catalog.get("nope"),
            Err(Error::StreamNotFound { .. })
        ));
    }

    #[test]
    fn test_selected_streams_resume_order() {
        let catalog = Catalog::from_yaml(CATALOG).unwrap();

        let names = vec!["branches".to_string(), "clients".to_string(), "groups".to_string()];
        let selected = catalog.selected(&names, Some("groups")).unwrap();
        let order: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order[0], "groups");
        assert_eq!(order.len(), 3);

        assert!(catalog.selected(&["missing".to_string()], None).is_err());
        assert_eq!(catalog.selected(&[], None).unwrap().len(), catalog.streams.len());
    }

    #[test]
    fn test_duplicate_stream_rejected() {
        let yaml = r#"
streams:
  - name: clients
    path: /clients
  - name: clients
    path: /clients
"#;
        assert!(matches!(Catalog::from_yaml(yaml), Err(Error::Config { .. })));
    }
}
