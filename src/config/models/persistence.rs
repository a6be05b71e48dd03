//! Persistence write-through configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Optional durable write-through of samples, handoff records and alert state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable the write-through
    #[serde(default)]
    pub enabled: bool,
    /// Append-only JSON lines file
    #[serde(default = "default_persistence_path")]
    pub path: String,
    /// Records queued before new ones are dropped
    #[serde(default = "default_persistence_buffer")]
    pub buffer_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_persistence_path(),
            buffer_size: default_persistence_buffer(),
        }
    }
}
