//! Per-window sample buffers

use super::bounded::BoundedPush;
use super::types::{RateCounts, Sample, WindowSlice};
use crate::config::WindowConfig;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// A named retention period with a sample cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    pub name: String,
    pub retention: Duration,
    pub max_samples: usize,
}

impl WindowSpec {
    pub fn new(name: impl Into<String>, retention: std::time::Duration, max_samples: usize) -> Self {
        Self {
            name: name.into(),
            retention: Duration::from_std(retention).unwrap_or(Duration::MAX),
            max_samples,
        }
    }

    /// Oldest timestamp still inside the window at `now`
    #[inline]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl From<&WindowConfig> for WindowSpec {
    fn from(config: &WindowConfig) -> Self {
        Self::new(config.name.clone(), config.retention(), config.max_samples)
    }
}

/// Compact stored form; the key already carries agent and operation
#[derive(Debug, Clone, Copy)]
struct StoredSample {
    timestamp: DateTime<Utc>,
    duration_ms: f64,
    success: bool,
    cache_hit: bool,
}

/// Bounded buffer for one key in one window
#[derive(Debug, Default)]
pub(super) struct WindowBuffer {
    samples: VecDeque<StoredSample>,
}

impl WindowBuffer {
    /// Append a sample, evicting by age relative to the sample and by count
    pub(super) fn push(&mut self, sample: &Sample, spec: &WindowSpec) {
        self.evict(spec, sample.timestamp);
        self.samples.push_bounded(
            StoredSample {
                timestamp: sample.timestamp,
                duration_ms: sample.duration_ms,
                success: sample.success,
                cache_hit: sample.cache_hit,
            },
            spec.max_samples,
        );
    }

    /// Drop samples that fell out of the window at `now`
    pub(super) fn evict(&mut self, spec: &WindowSpec, now: DateTime<Utc>) {
        let cutoff = spec.cutoff(now);
        while self
            .samples
            .front()
            .is_some_and(|sample| sample.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Samples inside the window at `now`.
    ///
    /// Front eviction assumes arrival order; the filter also excludes late,
    /// out-of-order samples that are already older than the cutoff.
    pub(super) fn slice(&mut self, spec: &WindowSpec, now: DateTime<Utc>) -> WindowSlice {
        self.evict(spec, now);
        let cutoff = spec.cutoff(now);

        let mut slice = WindowSlice::default();
        for sample in self.samples.iter().filter(|s| s.timestamp >= cutoff) {
            slice.durations.push(sample.duration_ms);
            slice.counts.observe(sample.success, sample.cache_hit);
        }
        slice
    }

    pub(super) fn counts(&mut self, spec: &WindowSpec, now: DateTime<Utc>) -> RateCounts {
        self.slice(spec, now).counts
    }

    pub(super) fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
