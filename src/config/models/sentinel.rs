//! Root sentinel configuration

#![allow(missing_docs)]

use super::*;
use serde::{Deserialize, Serialize};

/// Main sentinel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SentinelConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Span recording configuration
    #[serde(default)]
    pub tracing: TracingConfig,
    /// Rolling window definitions
    #[serde(default)]
    pub stats: StatsConfig,
    /// Handoff policy
    #[serde(default)]
    pub handoff: HandoffConfig,
    /// Alert rules, channels and escalation
    #[serde(default)]
    pub alerting: AlertingConfig,
    /// Optional durable write-through
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl SentinelConfig {
    /// Build a configuration from environment overrides on top of defaults
    pub fn from_env() -> crate::utils::error::Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `SENTINEL_*` environment overrides in place
    pub fn apply_env_overrides(&mut self) -> crate::utils::error::Result<()> {
        use crate::utils::error::SentinelError;

        if let Ok(level) = std::env::var("SENTINEL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SENTINEL_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(SentinelError::Config(format!(
                        "Unknown SENTINEL_LOG_FORMAT: {}",
                        other
                    )));
                }
            };
        }
        if let Ok(threshold) = std::env::var("SENTINEL_CONFIDENCE_THRESHOLD") {
            self.handoff.confidence_threshold = threshold.parse().map_err(|e| {
                SentinelError::Config(format!("Invalid SENTINEL_CONFIDENCE_THRESHOLD: {}", e))
            })?;
        }
        if let Ok(path) = std::env::var("SENTINEL_PERSISTENCE_PATH") {
            self.persistence.enabled = true;
            self.persistence.path = path;
        }
        Ok(())
    }
}
