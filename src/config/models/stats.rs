//! Rolling window configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rolling statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Window definitions; every sample is recorded into each of them
    #[serde(default = "default_windows")]
    pub windows: Vec<WindowConfig>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            windows: default_windows(),
        }
    }
}

/// A named retention period with a sample cap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window name, e.g. `1h`
    pub name: String,
    /// Retention period in seconds
    pub retention_seconds: u64,
    /// Maximum samples kept per (agent, operation) key
    pub max_samples: usize,
}

impl WindowConfig {
    /// Create a window definition
    pub fn new(name: impl Into<String>, retention: Duration, max_samples: usize) -> Self {
        Self {
            name: name.into(),
            retention_seconds: retention.as_secs(),
            max_samples,
        }
    }

    /// Retention as a duration
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }
}

fn default_windows() -> Vec<WindowConfig> {
    vec![
        WindowConfig::new("1h", Duration::from_secs(60 * 60), 10_000),
        WindowConfig::new("24h", Duration::from_secs(24 * 60 * 60), 50_000),
        WindowConfig::new("7d", Duration::from_secs(7 * 24 * 60 * 60), 100_000),
    ]
}
