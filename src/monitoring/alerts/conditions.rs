//! Alert conditions
//!
//! A condition is a pure function of a [`SystemSummary`]; the same snapshot always
//! yields the same match.

use crate::monitoring::handoff::BlockReason;
use crate::monitoring::metrics::{SlaTargets, SummaryMetric, SystemSummary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Comparison operators for threshold conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equal,
    NotEqual,
}

impl ComparisonOperator {
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::GreaterThan => value > threshold,
            ComparisonOperator::LessThan => value < threshold,
            ComparisonOperator::GreaterThanOrEqual => value >= threshold,
            ComparisonOperator::LessThanOrEqual => value <= threshold,
            ComparisonOperator::Equal => (value - threshold).abs() < f64::EPSILON,
            ComparisonOperator::NotEqual => (value - threshold).abs() >= f64::EPSILON,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
        }
    }
}

/// What a matching condition observed
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionMatch {
    pub value: f64,
    pub threshold: f64,
    pub subject: Option<String>,
    pub message: String,
}

type CustomFn = dyn Fn(&SystemSummary) -> Option<ConditionMatch> + Send + Sync;

/// Programmatic condition; not loadable from configuration
#[derive(Clone)]
pub struct CustomCondition {
    pub name: String,
    eval: Arc<CustomFn>,
}

impl CustomCondition {
    pub fn new<F>(name: impl Into<String>, eval: F) -> Self
    where
        F: Fn(&SystemSummary) -> Option<ConditionMatch> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            eval: Arc::new(eval),
        }
    }
}

impl fmt::Debug for CustomCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCondition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Alert condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertCondition {
    /// P95 above the SLA target. Checks every operation unless one is named;
    /// `target_ms` overrides the configured target.
    SlaBreach {
        #[serde(default)]
        operation: Option<String>,
        #[serde(default)]
        target_ms: Option<f64>,
    },
    /// Overall error rate above a ratio
    ErrorRateAbove { threshold: f64 },
    /// Overall cache hit rate below a ratio
    CacheHitRateBelow { threshold: f64 },
    /// Handoff success rate below a ratio
    HandoffSuccessBelow { threshold: f64 },
    /// An agent has recorded nothing for this long
    AgentSilence { silence_seconds: u64 },
    /// More than `threshold` handoffs blocked as circular in the window
    CircularHandoffSpike { threshold: u64 },
    /// Share of handoff attempts blocked by rate limits above a ratio
    RateLimitSpike { threshold: f64 },
    /// Generic comparison on a summary metric
    Threshold {
        metric: SummaryMetric,
        operator: ComparisonOperator,
        threshold: f64,
    },
    #[serde(skip)]
    Custom(CustomCondition),
}

impl AlertCondition {
    /// Evaluate against a summary.
    ///
    /// `min_samples` gates conditions that need data; with no data nothing matches.
    pub fn evaluate(
        &self,
        summary: &SystemSummary,
        sla: &SlaTargets,
        min_samples: usize,
    ) -> Option<ConditionMatch> {
        let enough = |count: usize| count > 0 && count >= min_samples;

        match self {
            AlertCondition::SlaBreach {
                operation,
                target_ms,
            } => {
                let mut worst: Option<ConditionMatch> = None;
                let candidates = summary
                    .operations
                    .iter()
                    .filter(|(name, _)| operation.as_ref().is_none_or(|op| op == *name));

                for (name, op_summary) in candidates {
                    if !enough(op_summary.total_count) {
                        continue;
                    }
                    let target = target_ms.unwrap_or_else(|| sla.target_for(name));
                    let excess = op_summary.p95 - target;
                    let is_worse = worst
                        .as_ref()
                        .is_none_or(|w| excess > w.value - w.threshold);
                    if excess > 0.0 && is_worse {
                        worst = Some(ConditionMatch {
                            value: op_summary.p95,
                            threshold: target,
                            subject: Some(name.clone()),
                            message: format!(
                                "{} P95 {:.0}ms exceeds SLA target {:.0}ms",
                                name, op_summary.p95, target
                            ),
                        });
                    }
                }
                worst
            }
            AlertCondition::ErrorRateAbove { threshold } => {
                let overall = &summary.overall;
                (enough(overall.total_count) && overall.error_rate > *threshold).then(|| {
                    ConditionMatch {
                        value: overall.error_rate,
                        threshold: *threshold,
                        subject: None,
                        message: format!(
                            "Error rate {:.1}% above {:.1}%",
                            overall.error_rate * 100.0,
                            threshold * 100.0
                        ),
                    }
                })
            }
            AlertCondition::CacheHitRateBelow { threshold } => {
                let overall = &summary.overall;
                (enough(overall.total_count) && overall.cache_hit_rate < *threshold).then(|| {
                    ConditionMatch {
                        value: overall.cache_hit_rate,
                        threshold: *threshold,
                        subject: None,
                        message: format!(
                            "Cache hit rate {:.1}% below {:.1}%",
                            overall.cache_hit_rate * 100.0,
                            threshold * 100.0
                        ),
                    }
                })
            }
            AlertCondition::HandoffSuccessBelow { threshold } => {
                let handoffs = &summary.handoffs;
                let completed = (handoffs.executed + handoffs.failed) as usize;
                (enough(completed) && handoffs.handoff_success_rate < *threshold).then(|| {
                    ConditionMatch {
                        value: handoffs.handoff_success_rate,
                        threshold: *threshold,
                        subject: None,
                        message: format!(
                            "Handoff success rate {:.1}% below {:.1}% ({} of {} failed)",
                            handoffs.handoff_success_rate * 100.0,
                            threshold * 100.0,
                            handoffs.failed,
                            completed
                        ),
                    }
                })
            }
            AlertCondition::AgentSilence { silence_seconds } => {
                let limit = chrono::Duration::seconds(*silence_seconds as i64);
                let mut silent: Vec<(&str, i64)> = summary
                    .agents
                    .values()
                    .filter_map(|agent| {
                        let idle = summary.generated_at - agent.last_seen?;
                        (idle >= limit).then_some((agent.agent_id.as_str(), idle.num_seconds()))
                    })
                    .collect();
                if silent.is_empty() {
                    return None;
                }
                silent.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

                let names: Vec<&str> = silent.iter().map(|(name, _)| *name).collect();
                Some(ConditionMatch {
                    value: silent[0].1 as f64,
                    threshold: *silence_seconds as f64,
                    subject: Some(names.join(",")),
                    message: format!(
                        "No samples for at least {}s from: {}",
                        silence_seconds,
                        names.join(", ")
                    ),
                })
            }
            AlertCondition::CircularHandoffSpike { threshold } => {
                let circular = summary.handoffs.blocked_for(BlockReason::Circular);
                (circular > *threshold).then(|| ConditionMatch {
                    value: circular as f64,
                    threshold: *threshold as f64,
                    subject: None,
                    message: format!(
                        "{} handoffs blocked as circular in {} (limit {})",
                        circular, summary.window, threshold
                    ),
                })
            }
            AlertCondition::RateLimitSpike { threshold } => {
                let handoffs = &summary.handoffs;
                let ratio = handoffs.rate_limited_ratio();
                (enough(handoffs.attempts as usize) && ratio > *threshold).then(|| {
                    ConditionMatch {
                        value: ratio,
                        threshold: *threshold,
                        subject: None,
                        message: format!(
                            "{:.1}% of handoff attempts rate limited (limit {:.1}%)",
                            ratio * 100.0,
                            threshold * 100.0
                        ),
                    }
                })
            }
            AlertCondition::Threshold {
                metric,
                operator,
                threshold,
            } => {
                if summary.overall.total_count < min_samples {
                    return None;
                }
                let value = summary.metric(*metric);
                operator.compare(value, *threshold).then(|| ConditionMatch {
                    value,
                    threshold: *threshold,
                    subject: None,
                    message: format!(
                        "{:?} is {} ({} {})",
                        metric,
                        value,
                        operator.symbol(),
                        threshold
                    ),
                })
            }
            AlertCondition::Custom(custom) => (custom.eval)(summary),
        }
    }
}
