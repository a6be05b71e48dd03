//! Configuration data models
//!
//! This module defines all configuration structures used throughout the sentinel.

#![allow(missing_docs)]

pub mod alerting;
pub mod handoff;
pub mod logging;
pub mod persistence;
pub mod sentinel;
pub mod stats;

// Re-export all configuration types
pub use alerting::*;
pub use handoff::*;
pub use logging::*;
pub use persistence::*;
pub use sentinel::*;
pub use stats::*;

/// Default values for configuration
pub fn default_true() -> bool {
    true
}

/// Default minimum confidence for a handoff
pub fn default_confidence_threshold() -> f64 {
    0.7
}

/// Default handoffs allowed per conversation per trailing hour
pub fn default_hourly_limit() -> u32 {
    3
}

/// Default handoffs allowed per conversation per trailing day
pub fn default_daily_limit() -> u32 {
    10
}

/// Default circular-handoff lookback in seconds (30 minutes)
pub fn default_circular_window_seconds() -> u64 {
    30 * 60
}

/// Default wait for the per-conversation lock in seconds
pub fn default_lock_timeout_seconds() -> u64 {
    30
}

/// Default handoff history retention in seconds (24 hours)
pub fn default_history_retention_seconds() -> u64 {
    24 * 60 * 60
}

/// Default alert cooldown in seconds
pub fn default_cooldown_seconds() -> u64 {
    300
}

/// Default rule evaluation interval in seconds
pub fn default_evaluation_interval_seconds() -> u64 {
    30
}

/// Default pending-dispatch drain interval in seconds
pub fn default_dispatch_interval_seconds() -> u64 {
    5
}

/// Default window used for alert evaluation
pub fn default_evaluation_window() -> String {
    "1h".to_string()
}

/// Default number of closed alerts kept in history
pub fn default_history_limit() -> usize {
    1000
}

/// Default escalation sweep interval in seconds
pub fn default_sweep_interval_seconds() -> u64 {
    30
}

/// Default delay before escalation level 2, measured from the trigger
pub fn default_level2_delay_seconds() -> u64 {
    5 * 60
}

/// Default delay before escalation level 3, measured from the trigger
pub fn default_level3_delay_seconds() -> u64 {
    15 * 60
}

/// Default P95 target applied to operations without an explicit SLA
pub fn default_sla_target_ms() -> f64 {
    2000.0
}

/// Default log level
pub fn default_log_level() -> String {
    "info".to_string()
}

/// Default service name for span recording
pub fn default_service_name() -> String {
    "handoff-sentinel".to_string()
}

/// Default persistence file
pub fn default_persistence_path() -> String {
    "data/sentinel.jsonl".to_string()
}

/// Default persistence queue size
pub fn default_persistence_buffer() -> usize {
    4096
}
