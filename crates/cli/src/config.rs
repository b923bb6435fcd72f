// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration and data directory layout.
//!
//! Everything lives in one data directory (default
//! `$XDG_DATA_HOME/rollcall`):
//! - `config.toml`: the active identity plus remote and sync settings
//! - `cache.db`: the durable local store
//! - `pending.jsonl`: the pending change log

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::gateway::GatewayConfig;
use crate::orchestrator::SyncOptions;

const APP_DIR_NAME: &str = "rollcall";
const CONFIG_FILE_NAME: &str = "config.toml";
const CACHE_DB_FILE_NAME: &str = "cache.db";
const PENDING_LOG_FILE_NAME: &str = "pending.jsonl";

/// Configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Identity whose collections this device caches and syncs.
    pub owner_id: String,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Remote store connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL of the rc-remote server.
    #[serde(default = "default_url")]
    pub url: String,
    /// Upper bound for a single remote call in milliseconds (default: 5000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Upper bound for opening the connection in seconds (default: 2).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Sync engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long the link must stay up before a reconnect triggers a sync (default: 500).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Groups per membership fetch (default: 50).
    #[serde(default = "default_membership_batch_size")]
    pub membership_batch_size: usize,
    /// Periodic reconciliation in seconds (default: 300). 0 = disabled.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    /// Reachability probe interval for `rollcall watch` in seconds (default: 10).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

fn default_url() -> String {
    "ws://127.0.0.1:7890".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_membership_batch_size() -> usize {
    50
}

fn default_reconcile_interval_secs() -> u64 {
    300
}

fn default_probe_interval_secs() -> u64 {
    10
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: default_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            debounce_ms: default_debounce_ms(),
            membership_batch_size: default_membership_batch_size(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

impl Config {
    /// Creates a config for `owner_id` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the owner id is blank.
    pub fn new(owner_id: impl Into<String>) -> Result<Self> {
        let owner_id = owner_id.into();
        if owner_id.trim().is_empty() {
            return Err(Error::Validation("owner id cannot be empty".into()));
        }
        Ok(Config {
            owner_id,
            remote: RemoteConfig::default(),
            sync: SyncConfig::default(),
        })
    }

    /// Loads configuration from the given data directory.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(Error::NotInitialized);
        }
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Saves configuration to the given data directory.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(data_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            url: self.remote.url.clone(),
            request_timeout: Duration::from_millis(self.remote.request_timeout_ms),
            connect_timeout: Duration::from_secs(self.remote.connect_timeout_secs),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        let interval = self.sync.reconcile_interval_secs;
        SyncOptions {
            request_timeout: Duration::from_millis(self.remote.request_timeout_ms),
            debounce: Duration::from_millis(self.sync.debounce_ms),
            membership_batch_size: self.sync.membership_batch_size.max(1),
            reconcile_interval: (interval > 0).then(|| Duration::from_secs(interval)),
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.sync.probe_interval_secs.max(1))
    }
}

/// Resolves the data directory: an explicit path wins, otherwise the
/// platform data dir.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .ok_or_else(|| Error::Config("cannot determine data directory; pass --data-dir".into()))
}

/// Creates the data directory and writes a fresh config.
pub fn init_data_dir(data_dir: &Path, config: &Config) -> Result<()> {
    if data_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(data_dir.display().to_string()));
    }
    fs::create_dir_all(data_dir)?;
    config.save(data_dir)
}

pub fn cache_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CACHE_DB_FILE_NAME)
}

pub fn pending_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(PENDING_LOG_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
