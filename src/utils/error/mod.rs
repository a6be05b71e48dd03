//! Error handling utilities
//!
//! This module defines the crate-wide error type. Policy outcomes such as a
//! blocked handoff or an empty statistics window are not errors and never
//! travel through this type.

pub mod error;

pub use error::*;
