//! # Handoff Sentinel
//!
//! Orchestration and observability core for a multi-agent chat bot.
//!
//! ## Features
//!
//! - **Rolling statistics**: per-agent, per-operation latency percentiles, error and
//!   cache-hit rates over configurable time windows
//! - **Handoff coordination**: rate limits, loop prevention and a confidence gate for
//!   agent-to-agent transfers, serialized per conversation
//! - **Metrics aggregation**: agent and system summaries with health classification
//! - **Alerting**: rule evaluation with cooldowns, multi-channel notification and an
//!   escalation ladder for critical alerts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use handoff_sentinel::{Config, HandoffSentinel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sentinel = HandoffSentinel::new(Config::default()).await?;
//!     sentinel.start().await?;
//!
//!     sentinel.interaction_completed("billing", "llm.generate", 182.0, true, false);
//!
//!     let decision = sentinel
//!         .handoff_proposed("conv-42", "billing", "support", 0.91)
//!         .await;
//!     if decision.allowed {
//!         sentinel
//!             .handoff_completed("conv-42", &decision.handoff_id, true)
//!             .await?;
//!     }
//!
//!     sentinel.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod monitoring;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use monitoring::{
    AlertEngine, HandoffCoordinator, HandoffSentinel, MetricsAggregator, RollingStatsStore,
    TickReport,
};
pub use utils::error::{Result, SentinelError};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
