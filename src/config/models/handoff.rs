//! Handoff policy configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Handoff coordinator policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Minimum confidence score for a transfer to be allowed
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Allowed handoffs per conversation in the trailing hour
    #[serde(default = "default_hourly_limit")]
    pub hourly_limit: u32,
    /// Allowed handoffs per conversation in the trailing 24 hours
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Lookback for A→B→A detection, in seconds
    #[serde(default = "default_circular_window_seconds")]
    pub circular_window_seconds: u64,
    /// Bounded wait on the per-conversation lock, in seconds
    #[serde(default = "default_lock_timeout_seconds")]
    pub lock_timeout_seconds: u64,
    /// How long handoff records are kept, in seconds
    #[serde(default = "default_history_retention_seconds")]
    pub history_retention_seconds: u64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            hourly_limit: default_hourly_limit(),
            daily_limit: default_daily_limit(),
            circular_window_seconds: default_circular_window_seconds(),
            lock_timeout_seconds: default_lock_timeout_seconds(),
            history_retention_seconds: default_history_retention_seconds(),
        }
    }
}

impl HandoffConfig {
    /// Lock wait as a duration
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }

    /// Circular lookback as a chrono duration
    pub fn circular_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.circular_window_seconds as i64)
    }

    /// History retention as a chrono duration
    pub fn history_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.history_retention_seconds as i64)
    }
}
