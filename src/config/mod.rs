//! Configuration management for the sentinel
//!
//! This module handles loading, validation, and management of all sentinel configuration.
//! Every option is plain data; callers may build a [`Config`] in code, from YAML, or from
//! the environment.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{Result, SentinelError};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the sentinel
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Sentinel configuration
    pub sentinel: SentinelConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SentinelError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml_str(&content)?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let sentinel: SentinelConfig = serde_yaml::from_str(content)
            .map_err(|e| SentinelError::Config(format!("Failed to parse config: {}", e)))?;

        let config = Self { sentinel };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables (reads `.env` when present)
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }

        let sentinel = SentinelConfig::from_env()?;
        let config = Self { sentinel };

        config.validate()?;
        Ok(config)
    }

    /// Get logging configuration
    pub fn logging(&self) -> &LoggingConfig {
        &self.sentinel.logging
    }

    /// Get stats configuration
    pub fn stats(&self) -> &StatsConfig {
        &self.sentinel.stats
    }

    /// Get handoff configuration
    pub fn handoff(&self) -> &HandoffConfig {
        &self.sentinel.handoff
    }

    /// Get alerting configuration
    pub fn alerting(&self) -> &AlertingConfig {
        &self.sentinel.alerting
    }

    /// Get persistence configuration
    pub fn persistence(&self) -> &PersistenceConfig {
        &self.sentinel.persistence
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.sentinel.validate().map_err(SentinelError::Validation)?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.sentinel).map_err(|e| {
            SentinelError::Config(format!("Failed to serialize config to JSON: {}", e))
        })
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.sentinel).map_err(|e| {
            SentinelError::Config(format!("Failed to serialize config to YAML: {}", e))
        })
    }
}
