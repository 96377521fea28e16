//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for server, store, worker, tools, and converters. Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub worker: WorkerConfig,
    pub router: RouterConfig,
    pub tools: ToolsConfig,
    /// Extra converter registrations appended after the built-in table.
    #[serde(default)]
    pub converters: Vec<ConverterSpec>,
    pub artifacts: ArtifactConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            worker: WorkerConfig::default(),
            router: RouterConfig::default(),
            tools: ToolsConfig::default(),
            converters: Vec::new(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }
        if self.store.task_ttl_secs == 0 {
            warnings.push("store.task_ttl_secs is 0; tasks expire immediately".into());
        }
        if self.store.task_ttl_secs < self.worker.task_timeout_secs {
            warnings.push(
                "store.task_ttl_secs is below worker.task_timeout_secs; \
                 long conversions may outlive their record"
                    .into(),
            );
        }
        if self.worker.poll_interval_secs == 0 {
            warnings.push("worker.poll_interval_secs is 0; workers will busy-poll".into());
        }
        if self.router.max_hops == 0 {
            warnings.push("router.max_hops is 0; only same-format copies will route".into());
        }

        for (i, spec) in self.converters.iter().enumerate() {
            if spec.input.is_empty() || spec.output.is_empty() {
                warnings.push(format!("converters[{i}] has an empty format"));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4586,
        }
    }
}

/// Task store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file path.
    pub db_path: PathBuf,
    /// Bounded lifetime attached to every task record, in seconds.
    pub task_ttl_secs: u64,
    /// Maximum number of requeues before a task stays `FAILED`.
    pub max_retries: u32,
    /// Records older than this many days are purged by housekeeping.
    pub cleanup_age_days: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("formrelay.db"),
            task_ttl_secs: 300,
            max_retries: 3,
            cleanup_age_days: 7,
        }
    }
}

/// Worker dispatch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Stable identifier for this worker instance; generated when unset.
    pub worker_id: Option<String>,
    /// Sleep between polls when the queue is empty, in seconds.
    pub poll_interval_secs: u64,
    /// Deadline for a single task, in seconds. Exceeding it produces a
    /// `TIMEOUT` status update, not a silent drop.
    pub task_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: None,
            poll_interval_secs: 1,
            task_timeout_secs: 60,
        }
    }
}

/// Format-routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Maximum number of conversion steps considered when routing.
    pub max_hops: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { max_hops: 3 }
    }
}

/// Optional overrides for external tool locations. Unset tools are located
/// via `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub freecadcmd_path: Option<PathBuf>,
    pub assimp_path: Option<PathBuf>,
    pub meshlabserver_path: Option<PathBuf>,
}

/// One entry of the converter registration table.
///
/// The built-in table is extended (or overridden, last-registered-wins) by
/// entries from the config file; no directory scanning or runtime reflection
/// is involved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterSpec {
    /// Input format identifier (lower case, e.g. "step").
    pub input: String,
    /// Output format identifier (lower case, e.g. "stl").
    pub output: String,
    /// Name of the external tool in the tool registry.
    pub tool: String,
    /// Argument template; `{input}` and `{output}` are substituted.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Artifact handling settings for the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory where published results are placed.
    pub output_dir: PathBuf,
    /// Base URL prefixed to published file names when forming `result_url`.
    /// When unset, the local file path is used.
    pub public_url: Option<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            public_url: None,
        }
    }
}
