//! Client configuration service
//!
//! Manages client configuration persistence using JSON file storage.

use crate::config::{
    CLIENT_CONFIG_FILE_NAME, DEFAULT_LOG_FILTER, DEFAULT_PROBE_INTERVAL_SECS,
    DEFAULT_SYNC_DEBOUNCE_MS,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Remote store endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Public (anon) API key sent with every request
    #[serde(default)]
    pub anon_key: Option<String>,
}

impl RemoteSettings {
    pub fn is_configured(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.base_url) && set(&self.anon_key)
    }
}

/// Sync timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Delay between going online and the automatic sync pass
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Whether the long-running commands poll the remote for reachability
    #[serde(default = "default_true")]
    pub probe_enabled: bool,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_SYNC_DEBOUNCE_MS
}

fn default_probe_interval_secs() -> u64 {
    DEFAULT_PROBE_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            probe_interval_secs: default_probe_interval_secs(),
            probe_enabled: true,
        }
    }
}

impl SyncSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Service for managing the client configuration file
#[derive(Clone)]
pub struct ClientConfigService {
    config_path: PathBuf,
}

impl ClientConfigService {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            config_path: data_dir.join(CLIENT_CONFIG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk or create the default if not exists
    pub async fn load(&self) -> Result<ClientConfig> {
        if !self.config_path.exists() {
            tracing::info!("Client config not found, creating default config");
            let default = ClientConfig::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.config_path).await?;
        let config: ClientConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse client config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self, config: &ClientConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| AppError::Generic(format!("Failed to serialize client config: {}", e)))?;

        fs::write(&self.config_path, content).await?;
        tracing::info!("Client config saved to {:?}", self.config_path);

        Ok(())
    }

    /// Update the remote endpoint
    pub async fn update_remote(&self, remote: RemoteSettings) -> Result<()> {
        let mut config = self.load().await?;
        config.remote = remote;
        self.save(&config).await
    }

    /// Update sync timing
    pub async fn update_sync(&self, sync: SyncSettings) -> Result<()> {
        let mut config = self.load().await?;
        config.sync = sync;
        self.save(&config).await
    }
}
