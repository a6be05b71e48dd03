//! Configuration validation
//!
//! This module provides validation logic for all configuration structures.
//!
//! - `sentinel_validators`: root, stats, handoff, logging and persistence sections
//! - `alerting_validators`: rules, channels and the escalation ladder
//! - `tests`: test suite for all validators

mod alerting_validators;
mod sentinel_validators;

/// Validation trait for configuration structures
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}
