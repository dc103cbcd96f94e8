//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{default_prehistoric_limit, default_true};
use super::queue::QueueConfig;
use super::timing::TimingConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Process-level settings (metrics, log format).
    #[serde(default)]
    pub server: ServerConfig,
    /// Activity and reclamation thresholds.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Queue naming conventions.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Behaviour when a scope becomes available.
    #[serde(default)]
    pub startup: StartupConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Process-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Member id the engine acts as upstream; items and reactions it
    /// authored are never reconciled.
    #[serde(default)]
    pub self_id: u64,
    /// Prometheus metrics HTTP port. Metrics are not served when unset.
    pub metrics_port: Option<u16>,
    /// Log output format (default: pretty).
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Replay of existing items when a scope becomes available.
#[derive(Debug, Clone, Deserialize)]
pub struct StartupConfig {
    /// Replay queue channel history on scope availability (default: true).
    #[serde(default = "default_true")]
    pub replay_history: bool,
    /// How many items older than the reclamation threshold are still replayed
    /// per channel before the walk stops (default: 7).
    #[serde(default = "default_prehistoric_limit")]
    pub prehistoric_limit: usize,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            replay_history: true,
            prehistoric_limit: default_prehistoric_limit(),
        }
    }
}
