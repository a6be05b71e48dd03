//! Sharded rolling statistics store

use super::types::{PercentileSummary, RateCounts, Sample, StatsKey, WindowSlice};
use super::window::{WindowBuffer, WindowSpec};
use crate::config::StatsConfig;
use crate::monitoring::persistence::{PersistRecord, PersistenceWriter};
use crate::monitoring::tracer::{NoopSpanRecorder, SpanRecorder};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

type Shard = Arc<Mutex<Vec<WindowBuffer>>>;

/// Rolling statistics per (agent, operation) key.
///
/// Every key owns one bounded buffer per configured window. Writers to the same key
/// serialize on the shard mutex; different keys never contend beyond the map lookup.
#[derive(Debug)]
pub struct RollingStatsStore {
    windows: Arc<Vec<WindowSpec>>,
    shards: DashMap<StatsKey, Shard>,
    last_seen: DashMap<String, DateTime<Utc>>,
    persistence: PersistenceWriter,
    recorder: Arc<dyn SpanRecorder>,
}

impl RollingStatsStore {
    /// Create a store with the given windows
    pub fn new(windows: Vec<WindowSpec>) -> Self {
        Self {
            windows: Arc::new(windows),
            shards: DashMap::new(),
            last_seen: DashMap::new(),
            persistence: PersistenceWriter::disabled(),
            recorder: Arc::new(NoopSpanRecorder),
        }
    }

    /// Create a store from configuration
    pub fn from_config(config: &StatsConfig) -> Self {
        Self::new(config.windows.iter().map(WindowSpec::from).collect())
    }

    /// Write every recorded sample through to `writer`
    pub fn with_persistence(mut self, writer: PersistenceWriter) -> Self {
        self.persistence = writer;
        self
    }

    /// Use `recorder` for spans opened by instrumentation
    pub fn with_span_recorder(mut self, recorder: Arc<dyn SpanRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Append a sample to every window buffer of its key
    pub fn record(&self, sample: Sample) {
        let shard = self
            .shards
            .entry(sample.key())
            .or_insert_with(|| {
                let buffers = self.windows.iter().map(|_| WindowBuffer::default()).collect();
                Arc::new(Mutex::new(buffers))
            })
            .clone();

        {
            let mut buffers = shard.lock();
            for (buffer, spec) in buffers.iter_mut().zip(self.windows.iter()) {
                buffer.push(&sample, spec);
            }
        }

        self.last_seen
            .entry(sample.agent_id.clone())
            .and_modify(|seen| {
                if sample.timestamp > *seen {
                    *seen = sample.timestamp;
                }
            })
            .or_insert(sample.timestamp);

        if self.persistence.is_enabled() {
            self.persistence.submit(PersistRecord::Sample(sample));
        }
    }

    /// Latency percentiles of one key in one window
    pub fn percentiles(&self, agent_id: &str, operation: &str, window: &str) -> PercentileSummary {
        self.percentiles_at(agent_id, operation, window, Utc::now())
    }

    /// Latency percentiles of one key in one window as of `now`.
    ///
    /// Returns the empty summary for unknown keys and unknown windows.
    pub fn percentiles_at(
        &self,
        agent_id: &str,
        operation: &str,
        window: &str,
        now: DateTime<Utc>,
    ) -> PercentileSummary {
        self.key_slice(agent_id, operation, window, now)
            .map(|slice| slice.percentiles())
            .unwrap_or_default()
    }

    /// Outcome counters of one key in one window
    pub fn counts(&self, agent_id: &str, operation: &str, window: &str) -> RateCounts {
        self.counts_at(agent_id, operation, window, Utc::now())
    }

    pub fn counts_at(
        &self,
        agent_id: &str,
        operation: &str,
        window: &str,
        now: DateTime<Utc>,
    ) -> RateCounts {
        self.key_slice(agent_id, operation, window, now)
            .map(|slice| slice.counts)
            .unwrap_or_default()
    }

    /// Failure ratio across every key in a window, zero without data
    pub fn error_rate(&self, window: &str) -> f64 {
        self.window_counts_at(window, Utc::now()).error_rate()
    }

    /// Cache hit ratio across every key in a window, zero without data
    pub fn cache_hit_rate(&self, window: &str) -> f64 {
        self.window_counts_at(window, Utc::now()).cache_hit_rate()
    }

    pub fn window_counts_at(&self, window: &str, now: DateTime<Utc>) -> RateCounts {
        self.collect_at(window, now, |_| true).counts
    }

    /// Live samples of every key in a window
    pub fn snapshot(&self, window: &str) -> Vec<(StatsKey, WindowSlice)> {
        self.snapshot_at(window, Utc::now())
    }

    /// Live samples of every key in a window as of `now`, sorted by key
    pub fn snapshot_at(&self, window: &str, now: DateTime<Utc>) -> Vec<(StatsKey, WindowSlice)> {
        let Some(index) = self.window_index(window) else {
            debug!("Snapshot requested for unknown window {}", window);
            return Vec::new();
        };
        let spec = &self.windows[index];

        let mut slices: Vec<_> = self
            .shard_handles()
            .into_iter()
            .filter_map(|(key, shard)| {
                let slice = shard.lock()[index].slice(spec, now);
                (slice.counts.total > 0).then_some((key, slice))
            })
            .collect();
        slices.sort_by(|a, b| a.0.cmp(&b.0));
        slices
    }

    /// Merge the live samples of every key accepted by `filter`
    pub fn collect_at<F>(&self, window: &str, now: DateTime<Utc>, filter: F) -> WindowSlice
    where
        F: Fn(&StatsKey) -> bool,
    {
        let mut merged = WindowSlice::default();
        for (key, slice) in self.snapshot_at(window, now) {
            if filter(&key) {
                merged.extend(slice);
            }
        }
        merged
    }

    /// Configured window by name
    pub fn window(&self, name: &str) -> Option<&WindowSpec> {
        self.windows.iter().find(|w| w.name == name)
    }

    pub fn windows(&self) -> &[WindowSpec] {
        &self.windows
    }

    pub fn window_names(&self) -> Vec<String> {
        self.windows.iter().map(|w| w.name.clone()).collect()
    }

    /// Every key that currently owns buffers
    pub fn keys(&self) -> Vec<StatsKey> {
        let mut keys: Vec<_> = self.shards.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Every agent that has recorded a sample
    pub fn agents(&self) -> Vec<String> {
        let agents: BTreeSet<String> = self
            .last_seen
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        agents.into_iter().collect()
    }

    /// Operations recorded by one agent
    pub fn operations(&self, agent_id: &str) -> Vec<String> {
        let operations: BTreeSet<String> = self
            .shards
            .iter()
            .filter(|entry| entry.key().agent_id == agent_id)
            .map(|entry| entry.key().operation.clone())
            .collect();
        operations.into_iter().collect()
    }

    /// Timestamp of the newest sample recorded by an agent
    pub fn last_seen(&self, agent_id: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(agent_id).map(|seen| *seen)
    }

    pub fn last_seen_all(&self) -> Vec<(String, DateTime<Utc>)> {
        let mut seen: Vec<_> = self
            .last_seen
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        seen.sort();
        seen
    }

    /// Evict expired samples everywhere and drop keys with no samples left.
    ///
    /// Reads and writes already evict lazily; this only reclaims idle keys. Agents left
    /// without any key are forgotten. Returns the number of keys dropped.
    pub fn compact_at(&self, now: DateTime<Utc>) -> usize {
        let windows = Arc::clone(&self.windows);
        let before = self.shards.len();

        self.shards.retain(|_, shard| {
            // A shard cloned by an in-flight `record` is kept
            if Arc::strong_count(shard) > 1 {
                return true;
            }
            let mut buffers = shard.lock();
            for (buffer, spec) in buffers.iter_mut().zip(windows.iter()) {
                buffer.evict(spec, now);
            }
            buffers.iter().any(|buffer| !buffer.is_empty())
        });

        let removed = before.saturating_sub(self.shards.len());
        if removed > 0 {
            debug!("Compacted {} idle stats keys", removed);
        }

        // Agents with no live key and nothing newer than the longest window are forgotten
        let horizon = windows
            .iter()
            .map(|spec| spec.cutoff(now))
            .min()
            .unwrap_or(now);
        let live: BTreeSet<String> = self
            .shards
            .iter()
            .map(|entry| entry.key().agent_id.clone())
            .collect();
        let agents_before = self.last_seen.len();
        self.last_seen
            .retain(|agent_id, seen| live.contains(agent_id) || *seen >= horizon);
        let retired = agents_before.saturating_sub(self.last_seen.len());
        if retired > 0 {
            debug!("Forgot {} agents with no samples in any window", retired);
        }

        removed
    }

    /// Span recorder used by instrumentation
    pub fn span_recorder(&self) -> &Arc<dyn SpanRecorder> {
        &self.recorder
    }

    fn window_index(&self, name: &str) -> Option<usize> {
        self.windows.iter().position(|w| w.name == name)
    }

    fn shard_handles(&self) -> Vec<(StatsKey, Shard)> {
        self.shards
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    fn key_slice(
        &self,
        agent_id: &str,
        operation: &str,
        window: &str,
        now: DateTime<Utc>,
    ) -> Option<WindowSlice> {
        let Some(index) = self.window_index(window) else {
            warn!("Unknown stats window {}", window);
            return None;
        };
        let shard = self
            .shards
            .get(&StatsKey::new(agent_id, operation))
            .map(|entry| Arc::clone(entry.value()))?;

        let slice = shard.lock()[index].slice(&self.windows[index], now);
        Some(slice)
    }
}

impl Default for RollingStatsStore {
    fn default() -> Self {
        Self::from_config(&StatsConfig::default())
    }
}
