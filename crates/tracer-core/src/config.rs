//! Configuration management for TRACER services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`TRACER__` prefix, `__` section separator,
//!    e.g. `TRACER__STORAGE__GRAPH__URI`)
//! 2. Config file (`tracer.toml` by default)
//! 3. Defaults

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level configuration shared by the CLI and the API server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracerConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default)]
    pub api: ApiSettings,
}

impl TracerConfig {
    /// Load configuration from `<file_prefix>.{toml,json,yaml}` (optional)
    /// overlaid with `TRACER__*` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("TRACER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: TracerConfig = cfg.try_deserialize()?;
        tracing::debug!(
            backend = ?loaded.storage.backend,
            data_dir = %loaded.storage.data_dir,
            "Configuration loaded"
        );
        Ok(loaded)
    }
}

// ── Storage ───────────────────────────────────────────────────────

/// Which repository variant to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Graph store when a connection URI is configured, files otherwise.
    #[default]
    Auto,
    File,
    Graph,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: BackendChoice,

    /// Root directory of the file-backed store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Bound on each connection attempt to the graph store.
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Bound on each graph store operation before it counts as a failure.
    #[serde(default = "default_timeout_ms")]
    pub op_timeout_ms: u64,

    #[serde(default)]
    pub graph: GraphSettings,
}

impl StorageSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: BackendChoice::default(),
            data_dir: default_data_dir(),
            connect_timeout_ms: default_timeout_ms(),
            op_timeout_ms: default_timeout_ms(),
            graph: GraphSettings::default(),
        }
    }
}

/// Connection settings for the Neo4j document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Bolt URI. Its presence selects the graph store under `auto`.
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default = "default_graph_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

impl GraphSettings {
    /// The configured URI, or the local default when forced without one.
    pub fn uri_or_default(&self) -> &str {
        self.uri.as_deref().unwrap_or("bolt://localhost:7687")
    }
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            uri: None,
            user: default_graph_user(),
            password: String::new(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

// ── Analysis ──────────────────────────────────────────────────────

/// Rule deciding which elements are flagged as pivot points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PivotRule {
    /// A lateral element is a pivot when at least one other element in the
    /// path is also lateral.
    #[default]
    SharedLateral,
    /// A lateral element is a pivot when both neighbours are non-lateral
    /// (endpoints count as non-lateral): one hop bridging two segments.
    Bridging,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default)]
    pub pivot_rule: PivotRule,
}

// ── Export ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory exported case files are written to.
    #[serde(default = "default_export_dir")]
    pub dir: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

// ── API ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Allowed CORS origins; `*` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_data_dir() -> String {
    "./tracer-data".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_graph_user() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_export_dir() -> String {
    ".".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
