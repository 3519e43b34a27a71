//! Configuration for event-mirror
//!
//! A single YAML file describes one synchronized collection: where the
//! remote list endpoint lives, how its parameters and fields are named,
//! where checkpoints and the mirror are stored, and the sync policy.
//!
//! ```yaml
//! collection: primary
//! remote:
//!   base_url: "https://www.googleapis.com/calendar/v3"
//!   path: "/calendars/{{ collection }}/events"
//!   headers:
//!     Authorization: "Bearer {{ env.ACCESS_TOKEN }}"
//! storage:
//!   state_path: ".event-mirror/state.json"
//!   mirror:
//!     type: duckdb
//!     path: ".event-mirror/mirror.duckdb"
//! sync:
//!   retention_days: 365
//! ```

use crate::checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::mirror::{DuckDbMirrorStore, FileMirrorStore, MemoryMirrorStore, MirrorStore};
use crate::remote::HttpRemoteSource;
use crate::sync::SyncConfig;
use crate::template::{self, TemplateContext};
use crate::types::{BackoffType, StringMap};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Collection name; also the checkpoint key and `{{ collection }}`
    pub collection: String,

    /// Remote list endpoint
    pub remote: RemoteConfig,

    /// Durable state locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Sync policy
    #[serde(default)]
    pub sync: SyncSettings,
}

impl AppConfig {
    /// Template context exposing `{{ collection }}`
    pub fn template_context(&self) -> TemplateContext {
        TemplateContext::for_collection(&self.collection)
    }

    /// Engine settings derived from the sync policy
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_retention(chrono::Duration::days(i64::from(self.sync.retention_days)))
            .with_max_pages(self.sync.max_pages)
    }

    /// Build the HTTP remote source, rendering templates
    pub fn remote_source(&self) -> Result<HttpRemoteSource> {
        HttpRemoteSource::from_config(&self.remote, &self.template_context())
    }

    /// Open the checkpoint store for this collection
    pub fn checkpoint_store(&self) -> Result<Arc<dyn CheckpointStore>> {
        if self.storage.mirror.backend == MirrorBackend::Memory {
            return Ok(Arc::new(MemoryCheckpointStore::new()));
        }
        let store = FileCheckpointStore::open(&self.storage.state_path, &self.collection)?;
        Ok(Arc::new(store))
    }

    /// Open the configured mirror backend
    pub fn mirror_store(&self) -> Result<Arc<dyn MirrorStore>> {
        let mirror = &self.storage.mirror;
        let require_path = || {
            mirror
                .path
                .as_deref()
                .ok_or_else(|| Error::missing_field("storage.mirror.path"))
        };

        let store: Arc<dyn MirrorStore> = match mirror.backend {
            MirrorBackend::File => Arc::new(FileMirrorStore::open(require_path()?)?),
            MirrorBackend::Duckdb => Arc::new(DuckDbMirrorStore::open(require_path()?)?),
            MirrorBackend::Memory => Arc::new(MemoryMirrorStore::new()),
        };
        Ok(store)
    }
}

// ============================================================================
// Remote Config
// ============================================================================

/// Remote list endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the API
    pub base_url: String,

    /// List endpoint path (templated)
    pub path: String,

    /// Headers sent with every request (templated)
    #[serde(default)]
    pub headers: StringMap,

    /// Extra query parameters sent with every request (templated)
    #[serde(default)]
    pub params: StringMap,

    /// Requested page size
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Query parameter names
    #[serde(default)]
    pub query: QueryParamNames,

    /// Response field names
    #[serde(default)]
    pub fields: ResponseFields,

    /// Statuses meaning "checkpoint no longer valid"
    #[serde(default = "default_invalidation_statuses")]
    pub invalidation_statuses: Vec<u16>,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_invalidation_statuses() -> Vec<u16> {
    vec![410]
}

/// Names of the query parameters sent to the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamNames {
    #[serde(default = "default_checkpoint_param")]
    pub checkpoint: String,
    #[serde(default = "default_page_cursor_param")]
    pub page_cursor: String,
    #[serde(default = "default_lower_bound_param")]
    pub lower_bound: String,
    #[serde(default = "default_page_size_param")]
    pub page_size: String,
}

impl Default for QueryParamNames {
    fn default() -> Self {
        Self {
            checkpoint: default_checkpoint_param(),
            page_cursor: default_page_cursor_param(),
            lower_bound: default_lower_bound_param(),
            page_size: default_page_size_param(),
        }
    }
}

fn default_checkpoint_param() -> String {
    "syncToken".to_string()
}

fn default_page_cursor_param() -> String {
    "pageToken".to_string()
}

fn default_lower_bound_param() -> String {
    "timeMin".to_string()
}

fn default_page_size_param() -> String {
    "maxResults".to_string()
}

/// Names of the fields read from a list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFields {
    #[serde(default = "default_items_field")]
    pub items: String,
    #[serde(default = "default_id_field")]
    pub id: String,
    #[serde(default = "default_status_field")]
    pub status: String,
    /// Status value marking a tombstone
    #[serde(default = "default_tombstone_value")]
    pub tombstone_value: String,
    #[serde(default = "default_next_cursor_field")]
    pub next_cursor: String,
    #[serde(default = "default_checkpoint_field")]
    pub checkpoint: String,
}

impl Default for ResponseFields {
    fn default() -> Self {
        Self {
            items: default_items_field(),
            id: default_id_field(),
            status: default_status_field(),
            tombstone_value: default_tombstone_value(),
            next_cursor: default_next_cursor_field(),
            checkpoint: default_checkpoint_field(),
        }
    }
}

fn default_items_field() -> String {
    "items".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_status_field() -> String {
    "status".to_string()
}

fn default_tombstone_value() -> String {
    "cancelled".to_string()
}

fn default_next_cursor_field() -> String {
    "nextPageToken".to_string()
}

fn default_checkpoint_field() -> String {
    "nextSyncToken".to_string()
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

    /// Maximum number of retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Rate limiting; `null` disables it
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: default_rate_limit(),
        }
    }
}

impl HttpConfig {
    /// Client settings for `base_url` with already rendered headers
    pub fn client_config(&self, base_url: &str, headers: StringMap) -> HttpClientConfig {
        let builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .backoff(
                self.retry_backoff.backoff_type,
                Duration::from_millis(self.retry_backoff.initial_ms),
                Duration::from_millis(self.retry_backoff.max_ms),
            )
            .headers(headers);

        match &self.rate_limit {
            Some(limit) => builder
                .rate_limit(RateLimiterConfig::new(
                    limit.requests_per_second,
                    limit.burst.unwrap_or(limit.requests_per_second),
                ))
                .build(),
            None => builder.no_rate_limit().build(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_rate_limit() -> Option<RateLimitConfig> {
    Some(RateLimitConfig::default())
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
    30_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second limit
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    /// Bucket size, defaults to the per-second rate
    #[serde(default)]
    pub burst: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst: None,
        }
    }
}

fn default_rps() -> u32 {
    5
}

// ============================================================================
// Storage Config
// ============================================================================

/// Where durable state lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON state file holding checkpoints keyed by collection
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Mirror backend
    #[serde(default)]
    pub mirror: MirrorConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            mirror: MirrorConfig::default(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".event-mirror/state.json")
}

/// Mirror backend selection
///
/// `memory` keeps the checkpoint in process as well, so nothing is
/// persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(rename = "type", default)]
    pub backend: MirrorBackend,

    /// Mirror file; required for `file` and `duckdb`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            backend: MirrorBackend::File,
            path: Some(PathBuf::from(".event-mirror/mirror.json")),
        }
    }
}

/// Supported mirror backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorBackend {
    #[default]
    File,
    Duckdb,
    Memory,
}

// ============================================================================
// Sync Settings
// ============================================================================

/// Longest accepted retention horizon (about a century)
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Sync policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Full syncs only fetch items newer than this many days
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Page cap per pass
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_retention_days() -> u32 {
    365
}

fn default_max_pages() -> usize {
    10_000
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a config file
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;

    load_config_from_str(&content).with_context(|| format!("Invalid config '{}'", path.display()))
}

/// Parse and validate a YAML config
pub fn load_config_from_str(yaml: &str) -> Result<AppConfig> {
    let config: AppConfig = serde_yaml::from_str(yaml)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate a parsed config
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.collection.trim().is_empty() {
        return Err(Error::config("collection cannot be empty"));
    }

    let remote = &config.remote;
    if remote.base_url.is_empty() {
        return Err(Error::config("remote.base_url cannot be empty"));
    }
    Url::parse(&remote.base_url)?;

    if remote.path.is_empty() {
        return Err(Error::config("remote.path cannot be empty"));
    }
    template::validate(&remote.path)?;
    for value in remote.headers.values().chain(remote.params.values()) {
        template::validate(value)?;
    }

    if remote.page_size == Some(0) {
        return Err(Error::invalid_value("remote.page_size", "must be positive"));
    }
    if remote.invalidation_statuses.iter().any(|s| *s < 400) {
        return Err(Error::invalid_value(
            "remote.invalidation_statuses",
            "only error statuses (>= 400) can invalidate a checkpoint",
        ));
    }

    if config.sync.retention_days == 0 {
        return Err(Error::invalid_value("sync.retention_days", "must be positive"));
    }
    if config.sync.retention_days > MAX_RETENTION_DAYS {
        return Err(Error::invalid_value(
            "sync.retention_days",
            format!("must be at most {MAX_RETENTION_DAYS}"),
        ));
    }
    if config.sync.max_pages == 0 {
        return Err(Error::invalid_value("sync.max_pages", "must be positive"));
    }

    let mirror = &config.storage.mirror;
    if mirror.backend != MirrorBackend::Memory && mirror.path.is_none() {
        return Err(Error::missing_field("storage.mirror.path"));
    }

    Ok(())
}
