//! Root and component configuration validators

use super::Validate;
use crate::config::models::*;
use std::collections::HashSet;
use tracing::debug;

impl Validate for SentinelConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating sentinel configuration");

        self.logging.validate()?;
        self.stats.validate()?;
        self.handoff.validate()?;
        self.alerting.validate()?;
        self.persistence.validate()?;

        if !self
            .stats
            .windows
            .iter()
            .any(|w| w.name == self.alerting.evaluation_window)
        {
            return Err(format!(
                "Alert evaluation window '{}' is not a configured stats window",
                self.alerting.evaluation_window
            ));
        }

        Ok(())
    }
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.level.trim().is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Validate for StatsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.windows.is_empty() {
            return Err("At least one stats window must be configured".to_string());
        }

        let mut names = HashSet::new();
        for window in &self.windows {
            if window.name.is_empty() {
                return Err("Window name cannot be empty".to_string());
            }
            if !names.insert(window.name.as_str()) {
                return Err(format!("Duplicate window name: {}", window.name));
            }
            if window.retention_seconds == 0 {
                return Err(format!(
                    "Window '{}' retention must be greater than 0",
                    window.name
                ));
            }
            if window.max_samples == 0 {
                return Err(format!(
                    "Window '{}' max_samples must be greater than 0",
                    window.name
                ));
            }
        }

        Ok(())
    }
}

impl Validate for HandoffConfig {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
        }
        if self.hourly_limit == 0 || self.daily_limit == 0 {
            return Err("Handoff rate limits must be greater than 0".to_string());
        }
        if self.hourly_limit > self.daily_limit {
            return Err("Hourly handoff limit cannot exceed the daily limit".to_string());
        }
        if self.lock_timeout_seconds == 0 {
            return Err("Lock timeout must be greater than 0".to_string());
        }
        if self.history_retention_seconds < 24 * 60 * 60 {
            return Err("Handoff history must be retained for at least 24 hours".to_string());
        }
        if self.circular_window_seconds > self.history_retention_seconds {
            return Err("Circular lookback cannot exceed history retention".to_string());
        }
        Ok(())
    }
}

impl Validate for PersistenceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.path.trim().is_empty() {
            return Err("Persistence path must be set when persistence is enabled".to_string());
        }
        if self.buffer_size == 0 {
            return Err("Persistence buffer size must be greater than 0".to_string());
        }
        Ok(())
    }
}
