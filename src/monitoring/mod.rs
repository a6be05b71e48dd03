//! Handoff orchestration and observability
//!
//! Four components make up the core: a rolling stats store fed by completed
//! interactions, a handoff coordinator that gates agent-to-agent transfers, a metrics
//! aggregator that turns both into summaries, and an alert engine that evaluates those
//! summaries and notifies channels. [`HandoffSentinel`] wires them together.

pub mod alerts;
pub mod handoff;
pub mod metrics;
pub mod persistence;
pub mod stats;
pub mod tracer;

mod background;
mod system;

pub use alerts::{Alert, AlertEngine, AlertRule, AlertSeverity, EscalationState};
pub use handoff::{BlockReason, HandoffCoordinator, HandoffDecision, HandoffRequest};
pub use metrics::{HealthReport, MetricsAggregator, SystemSummary};
pub use persistence::{JsonlFileSink, PersistRecord, PersistenceSink, PersistenceWriter};
pub use stats::{OperationTimer, RollingStatsStore, Sample};
pub use system::{HandoffSentinel, TickReport};
