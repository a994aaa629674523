//! Core configuration
//!
//! The host application (HTTP layer, CLI) supplies this configuration; the
//! core only consumes it. The mirror backend is entirely optional: leaving
//! `mirror` unset runs the session store in blob-only mode.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default ceiling for artefact downloads and persistence calls, generous
/// enough for multi-megabyte log files.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Default sub-folder for chat session blobs under a dataset prefix.
pub const DEFAULT_CHAT_LOGS_FOLDER: &str = "chat_logs/";

/// Configuration for the logmine core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Root directory for per-(user, dataset) artefact caches
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,
    /// Timeout applied to every artefact download and persistence call
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    /// Chat-log sub-folder used when the dataset description carries no hint
    #[serde(default = "default_chat_logs_folder")]
    pub chat_logs_folder: String,
    /// Optional document-database mirror backend; `None` disables it
    #[serde(default)]
    pub mirror: Option<MirrorConfig>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            download_timeout_secs: default_download_timeout(),
            chat_logs_folder: default_chat_logs_folder(),
            mirror: None,
        }
    }
}

impl CoreConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache root directory
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Set the download timeout in seconds
    pub fn with_download_timeout_secs(mut self, seconds: u64) -> Self {
        self.download_timeout_secs = seconds;
        self
    }

    /// Enable the mirror backend
    pub fn with_mirror(mut self, mirror: MirrorConfig) -> Self {
        self.mirror = Some(mirror);
        self
    }
}

/// Configuration for the optional document-database mirror backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Base endpoint of the document API
    pub endpoint: String,
    /// API key sent with every request, if the deployment requires one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Database name
    #[serde(default = "default_mirror_database")]
    pub database: String,
    /// Collection name
    #[serde(default = "default_mirror_collection")]
    pub collection: String,
}

impl MirrorConfig {
    /// Create a mirror config for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            database: default_mirror_database(),
            collection: default_mirror_collection(),
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("logmine")
        .join("datasets")
}

fn default_download_timeout() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_chat_logs_folder() -> String {
    DEFAULT_CHAT_LOGS_FOLDER.to_string()
}

fn default_mirror_database() -> String {
    "miner".to_string()
}

fn default_mirror_collection() -> String {
    "chat_sessions".to_string()
}
