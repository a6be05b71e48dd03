//! Sample and statistics types

use super::helpers::{calculate_percentile, sort_durations};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One measurement of a tracked operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Agent that performed the operation
    pub agent_id: String,
    /// Operation name, e.g. `lead.qualify`
    pub operation: String,
    /// When the operation finished
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,
    /// Whether the operation succeeded
    pub success: bool,
    /// Whether the operation was served from cache
    pub cache_hit: bool,
}

impl Sample {
    /// Create a sample timestamped now
    pub fn new(
        agent_id: impl Into<String>,
        operation: impl Into<String>,
        duration_ms: f64,
        success: bool,
        cache_hit: bool,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
            duration_ms,
            success,
            cache_hit,
        }
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Key this sample is stored under
    pub fn key(&self) -> StatsKey {
        StatsKey::new(&self.agent_id, &self.operation)
    }
}

/// Store shard key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatsKey {
    pub agent_id: String,
    pub operation: String,
}

impl StatsKey {
    pub fn new(agent_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            operation: operation.into(),
        }
    }
}

/// Latency distribution of a window.
///
/// A summary with `count == 0` is the "insufficient data" result; every other
/// field is zero in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PercentileSummary {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl PercentileSummary {
    /// Compute from unsorted durations
    pub fn from_durations(mut durations: Vec<f64>) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        sort_durations(&mut durations);
        let count = durations.len();
        let sum: f64 = durations.iter().sum();

        Self {
            p50: calculate_percentile(&durations, 0.50),
            p95: calculate_percentile(&durations, 0.95),
            p99: calculate_percentile(&durations, 0.99),
            mean: sum / count as f64,
            min: durations[0],
            max: durations[count - 1],
            count,
        }
    }

    /// Whether there was no data to summarise
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Outcome counters of a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateCounts {
    pub total: usize,
    pub failures: usize,
    pub cache_hits: usize,
}

impl RateCounts {
    /// Count one sample
    pub fn observe(&mut self, success: bool, cache_hit: bool) {
        self.total += 1;
        if !success {
            self.failures += 1;
        }
        if cache_hit {
            self.cache_hits += 1;
        }
    }

    /// Add another set of counters
    pub fn merge(&mut self, other: &RateCounts) {
        self.total += other.total;
        self.failures += other.failures;
        self.cache_hits += other.cache_hits;
    }

    /// `failures / total`, zero when there is no data
    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failures as f64 / self.total as f64
        }
    }

    /// `cache_hits / total`, zero when there is no data
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total as f64
        }
    }

    pub fn success_count(&self) -> usize {
        self.total - self.failures
    }
}

/// Live contents of one window across one or more keys
#[derive(Debug, Clone, Default)]
pub struct WindowSlice {
    /// Durations in arrival order
    pub durations: Vec<f64>,
    /// Outcome counters over the same samples
    pub counts: RateCounts,
}

impl WindowSlice {
    /// Append another slice
    pub fn extend(&mut self, other: WindowSlice) {
        self.durations.extend(other.durations);
        self.counts.merge(&other.counts);
    }

    /// Latency distribution of the slice
    pub fn percentiles(&self) -> PercentileSummary {
        PercentileSummary::from_durations(self.durations.clone())
    }
}
