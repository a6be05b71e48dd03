//! Summary types

use crate::config::AlertingConfig;
use crate::monitoring::handoff::{BlockReason, OutcomeCounts};
use crate::monitoring::stats::WindowSlice;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// P95 latency targets per operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlaTargets {
    pub targets: BTreeMap<String, f64>,
    pub default_ms: f64,
}

impl SlaTargets {
    pub fn target_for(&self, operation: &str) -> f64 {
        self.targets
            .get(operation)
            .copied()
            .unwrap_or(self.default_ms)
    }
}

impl Default for SlaTargets {
    fn default() -> Self {
        Self::from(&AlertingConfig::default())
    }
}

impl From<&AlertingConfig> for SlaTargets {
    fn from(config: &AlertingConfig) -> Self {
        Self {
            targets: config.sla_targets.clone(),
            default_ms: config.default_sla_target_ms,
        }
    }
}

/// Latency and outcome figures over one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub mean: f64,
    pub error_rate: f64,
    pub cache_hit_rate: f64,
    pub success_count: usize,
    pub total_count: usize,
}

impl Summary {
    pub fn from_slice(slice: &WindowSlice) -> Self {
        let percentiles = slice.percentiles();
        Self {
            p50: percentiles.p50,
            p95: percentiles.p95,
            p99: percentiles.p99,
            mean: percentiles.mean,
            error_rate: slice.counts.error_rate(),
            cache_hit_rate: slice.counts.cache_hit_rate(),
            success_count: slice.counts.success_count(),
            total_count: slice.counts.total,
        }
    }

    /// No samples in the window
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// One agent's figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub summary: Summary,
    pub operations: BTreeMap<String, Summary>,
    /// Newest sample from this agent, in any window
    pub last_seen: Option<DateTime<Utc>>,
}

/// Handoff figures over one window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HandoffSummary {
    pub attempts: u64,
    pub allowed: u64,
    pub executed: u64,
    pub failed: u64,
    pub blocked_by_reason: BTreeMap<BlockReason, u64>,
    /// `executed / (executed + failed)`, 1.0 without completions
    pub handoff_success_rate: f64,
}

impl HandoffSummary {
    pub fn blocked(&self) -> u64 {
        self.blocked_by_reason.values().sum()
    }

    pub fn blocked_for(&self, reason: BlockReason) -> u64 {
        self.blocked_by_reason.get(&reason).copied().unwrap_or(0)
    }

    /// Share of attempts rejected by a rate limit, zero without attempts
    pub fn rate_limited_ratio(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        let limited: u64 = self
            .blocked_by_reason
            .iter()
            .filter(|(reason, _)| reason.is_rate_limit())
            .map(|(_, count)| count)
            .sum();
        limited as f64 / self.attempts as f64
    }
}

impl From<OutcomeCounts> for HandoffSummary {
    fn from(counts: OutcomeCounts) -> Self {
        let handoff_success_rate = counts.success_rate();
        Self {
            attempts: counts.attempts,
            allowed: counts.allowed,
            executed: counts.executed,
            failed: counts.failed,
            blocked_by_reason: counts.blocked_by_reason,
            handoff_success_rate,
        }
    }
}

/// System-wide snapshot fed to alert evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSummary {
    pub window: String,
    pub generated_at: DateTime<Utc>,
    pub overall: Summary,
    pub agents: BTreeMap<String, AgentSummary>,
    /// Per-operation figures merged across agents
    pub operations: BTreeMap<String, Summary>,
    pub handoffs: HandoffSummary,
}

impl SystemSummary {
    /// Scalar value of a named metric
    pub fn metric(&self, metric: SummaryMetric) -> f64 {
        match metric {
            SummaryMetric::P50 => self.overall.p50,
            SummaryMetric::P95 => self.overall.p95,
            SummaryMetric::P99 => self.overall.p99,
            SummaryMetric::Mean => self.overall.mean,
            SummaryMetric::ErrorRate => self.overall.error_rate,
            SummaryMetric::CacheHitRate => self.overall.cache_hit_rate,
            SummaryMetric::TotalCount => self.overall.total_count as f64,
            SummaryMetric::HandoffSuccessRate => self.handoffs.handoff_success_rate,
            SummaryMetric::BlockedHandoffs => self.handoffs.blocked() as f64,
            SummaryMetric::RateLimitedRatio => self.handoffs.rate_limited_ratio(),
        }
    }
}

/// Scalar metrics exposed by a [`SystemSummary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMetric {
    P50,
    P95,
    P99,
    Mean,
    ErrorRate,
    CacheHitRate,
    TotalCount,
    HandoffSuccessRate,
    BlockedHandoffs,
    RateLimitedRatio,
}

/// Agent health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    NoData,
    Healthy,
    Degraded,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::NoData => "no_data",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Health of one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentHealth {
    pub agent_id: String,
    pub status: HealthStatus,
    pub p95_ms: f64,
    pub error_rate: f64,
    pub issues: Vec<String>,
}

/// Health of every agent plus the worst status among them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub window: String,
    pub generated_at: DateTime<Utc>,
    pub status: HealthStatus,
    pub agents: Vec<AgentHealth>,
}

impl HealthReport {
    pub fn agent(&self, agent_id: &str) -> Option<&AgentHealth> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }
}
