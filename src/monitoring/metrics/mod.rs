//! Metrics aggregation
//!
//! Summaries are computed on demand from the rolling stats store and the handoff
//! coordinator's outcome log; the aggregator keeps no state of its own.

mod aggregator;
mod types;


pub use aggregator::MetricsAggregator;
pub use types::{
    AgentHealth, AgentSummary, HandoffSummary, HealthReport, HealthStatus, SlaTargets, Summary,
    SummaryMetric, SystemSummary,
};
