//! Error types for the handoff sentinel

#![allow(missing_docs)]

use thiserror::Error;

/// Result type alias for the sentinel
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Main error type for the sentinel
#[derive(Error, Debug)]
pub enum SentinelError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Persistence write-through errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SentinelError {
    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}
