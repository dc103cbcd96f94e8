//! Timing configuration.

use super::defaults::{default_active_window_secs, default_clean_after_secs, default_epsilon_ms};
use serde::Deserialize;
use std::time::Duration;

/// Timing thresholds as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Seconds without a liveness signal before a scope is considered inactive (default: 3600).
    #[serde(default = "default_active_window_secs")]
    pub active_window_secs: u64,
    /// Seconds without mutation before a member's state is reclaimed (default: one week).
    #[serde(default = "default_clean_after_secs")]
    pub clean_after_secs: u64,
    /// Slack added to every wake-up, in milliseconds (default: 10000).
    #[serde(default = "default_epsilon_ms")]
    pub epsilon_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            active_window_secs: default_active_window_secs(),
            clean_after_secs: default_clean_after_secs(),
            epsilon_ms: default_epsilon_ms(),
        }
    }
}

/// Timing thresholds in the form the engine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// `ACTIVE_WINDOW`.
    pub active_window: Duration,
    /// `TIME_LIMIT_CLEAN`.
    pub clean_after: Duration,
    /// `EPSILON`.
    pub epsilon: Duration,
}

impl From<&TimingConfig> for Timing {
    fn from(config: &TimingConfig) -> Self {
        Self {
            active_window: Duration::from_secs(config.active_window_secs),
            clean_after: Duration::from_secs(config.clean_after_secs),
            epsilon: Duration::from_millis(config.epsilon_ms),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}
