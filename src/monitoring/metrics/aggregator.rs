//! Metrics aggregator implementation

use super::types::{
    AgentHealth, AgentSummary, HandoffSummary, HealthReport, HealthStatus, SlaTargets, Summary,
    SystemSummary,
};
use crate::config::AlertingConfig;
use crate::monitoring::alerts::{Alert, AlertEngine};
use crate::monitoring::handoff::{HandoffCoordinator, HANDOFF_OPERATION};
use crate::monitoring::stats::{RollingStatsStore, WindowSlice};
use crate::utils::error::{Result, SentinelError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Error rate above which an agent is degraded
const ERROR_RATE_DEGRADED: f64 = 0.01;
/// Error rate above which an agent is critical
const ERROR_RATE_CRITICAL: f64 = 0.05;
/// P95 above this multiple of the SLA target is critical
const SLA_CRITICAL_FACTOR: f64 = 2.0;

/// Builds summaries from the stats store and handoff outcomes
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    stats: Arc<RollingStatsStore>,
    handoffs: Arc<HandoffCoordinator>,
    sla: SlaTargets,
}

impl MetricsAggregator {
    /// Create an aggregator using default SLA targets
    pub fn new(stats: Arc<RollingStatsStore>, handoffs: Arc<HandoffCoordinator>) -> Self {
        Self {
            stats,
            handoffs,
            sla: SlaTargets::default(),
        }
    }

    /// Take SLA targets from alerting configuration
    pub fn with_sla_targets(mut self, config: &AlertingConfig) -> Self {
        self.sla = SlaTargets::from(config);
        self
    }

    pub fn sla_targets(&self) -> &SlaTargets {
        &self.sla
    }

    /// Figures for one agent across all its operations
    pub fn summary(&self, agent_id: &str, window: &str) -> Result<Summary> {
        self.summary_at(agent_id, window, Utc::now())
    }

    /// Figures for one agent as of `now`.
    ///
    /// An agent with no samples yields the empty summary; an unknown window is an error.
    pub fn summary_at(&self, agent_id: &str, window: &str, now: DateTime<Utc>) -> Result<Summary> {
        self.ensure_window(window)?;
        let slice = self
            .stats
            .collect_at(window, now, |key| key.agent_id == agent_id);
        Ok(Summary::from_slice(&slice))
    }

    /// Every agent merged, plus handoff figures.
    ///
    /// `overall` covers agent interactions only; handoff latency is reported under its
    /// own operation.
    pub fn system_summary(&self, window: &str) -> Result<SystemSummary> {
        self.system_summary_at(window, Utc::now())
    }

    pub fn system_summary_at(&self, window: &str, now: DateTime<Utc>) -> Result<SystemSummary> {
        let retention = self.ensure_window(window)?;

        let mut overall = WindowSlice::default();
        let mut per_agent: BTreeMap<String, (WindowSlice, BTreeMap<String, Summary>)> =
            BTreeMap::new();
        let mut per_operation: BTreeMap<String, WindowSlice> = BTreeMap::new();

        for (key, slice) in self.stats.snapshot_at(window, now) {
            let summary = Summary::from_slice(&slice);
            per_operation
                .entry(key.operation.clone())
                .or_default()
                .extend(slice.clone());

            // Handoff samples stay out of interaction rates
            if key.operation != HANDOFF_OPERATION {
                overall.extend(slice.clone());
            }

            let (agent_slice, operations) = per_agent.entry(key.agent_id).or_default();
            operations.insert(key.operation, summary);
            agent_slice.extend(slice);
        }

        // Agents with no samples in this window still appear, for silence detection
        let mut agents = BTreeMap::new();
        for (agent_id, last_seen) in self.stats.last_seen_all() {
            let (slice, operations) = per_agent.remove(&agent_id).unwrap_or_default();
            agents.insert(
                agent_id.clone(),
                AgentSummary {
                    agent_id,
                    summary: Summary::from_slice(&slice),
                    operations,
                    last_seen: Some(last_seen),
                },
            );
        }

        let since = now
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let handoffs = HandoffSummary::from(self.handoffs.outcome_counts(since));

        debug!(
            "Built system summary for window {} over {} agents",
            window,
            agents.len()
        );

        Ok(SystemSummary {
            window: window.to_string(),
            generated_at: now,
            overall: Summary::from_slice(&overall),
            agents,
            operations: per_operation
                .into_iter()
                .map(|(operation, slice)| (operation, Summary::from_slice(&slice)))
                .collect(),
            handoffs,
        })
    }

    /// Push the current system summary into alert evaluation
    pub fn feed_alerting(&self, engine: &AlertEngine, window: &str) -> Result<Vec<Alert>> {
        self.feed_alerting_at(engine, window, Utc::now())
    }

    pub fn feed_alerting_at(
        &self,
        engine: &AlertEngine,
        window: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let summary = self.system_summary_at(window, now)?;
        Ok(engine.evaluate(&summary))
    }

    /// Classify every agent by latency against its SLA targets and by error rate
    pub fn health_report(&self, window: &str) -> Result<HealthReport> {
        self.health_report_at(window, Utc::now())
    }

    pub fn health_report_at(&self, window: &str, now: DateTime<Utc>) -> Result<HealthReport> {
        let summary = self.system_summary_at(window, now)?;

        let agents: Vec<AgentHealth> = summary
            .agents
            .values()
            .map(|agent| self.classify(agent))
            .collect();

        let status = agents
            .iter()
            .map(|a| a.status)
            .max()
            .unwrap_or(HealthStatus::NoData);

        Ok(HealthReport {
            window: summary.window,
            generated_at: summary.generated_at,
            status,
            agents,
        })
    }

    fn classify(&self, agent: &AgentSummary) -> AgentHealth {
        let mut health = AgentHealth {
            agent_id: agent.agent_id.clone(),
            status: HealthStatus::Healthy,
            p95_ms: agent.summary.p95,
            error_rate: agent.summary.error_rate,
            issues: Vec::new(),
        };

        if agent.summary.is_empty() {
            health.status = HealthStatus::NoData;
            return health;
        }

        for (operation, summary) in &agent.operations {
            let target = self.sla.target_for(operation);
            if summary.p95 > target * SLA_CRITICAL_FACTOR {
                health.status = HealthStatus::Critical;
                health.issues.push(format!(
                    "{} P95 ({:.0}ms) exceeds twice its {:.0}ms target",
                    operation, summary.p95, target
                ));
            } else if summary.p95 > target {
                health.status = health.status.max(HealthStatus::Degraded);
                health.issues.push(format!(
                    "{} P95 ({:.0}ms) exceeds its {:.0}ms target",
                    operation, summary.p95, target
                ));
            }
        }

        let error_rate = agent.summary.error_rate;
        if error_rate > ERROR_RATE_CRITICAL {
            health.status = HealthStatus::Critical;
            health.issues.push(format!(
                "Error rate {:.1}% above {:.0}%",
                error_rate * 100.0,
                ERROR_RATE_CRITICAL * 100.0
            ));
        } else if error_rate > ERROR_RATE_DEGRADED {
            health.status = health.status.max(HealthStatus::Degraded);
            health.issues.push(format!(
                "Error rate {:.1}% above {:.0}%",
                error_rate * 100.0,
                ERROR_RATE_DEGRADED * 100.0
            ));
        }

        health
    }

    /// Retention of a configured window, or `NotFound`
    fn ensure_window(&self, window: &str) -> Result<chrono::Duration> {
        self.stats
            .window(window)
            .map(|spec| spec.retention)
            .ok_or_else(|| SentinelError::not_found(format!("Window {} not configured", window)))
    }
}
