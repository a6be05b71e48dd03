//! Handoff coordinator implementation

use super::history::ConversationHistory;
use super::types::{
    BlockReason, HandoffDecision, HandoffOutcome, HandoffRecord, HandoffRequest, OutcomeCounts,
    HANDOFF_OPERATION,
};
use crate::config::HandoffConfig;
use crate::monitoring::persistence::{PersistRecord, PersistenceWriter};
use crate::monitoring::stats::{RollingStatsStore, Sample};
use crate::utils::error::{Result, SentinelError};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

type ConversationSlot = Arc<TokioMutex<ConversationHistory>>;

/// Serializes and decides handoff requests per conversation
#[derive(Debug)]
pub struct HandoffCoordinator {
    config: HandoffConfig,
    lock_timeout: std::time::Duration,
    /// Per-conversation history, each behind its own lock
    conversations: DashMap<String, ConversationSlot>,
    /// Every decision and completion, including lock timeouts
    events: Mutex<VecDeque<HandoffRecord>>,
    stats: Option<Arc<RollingStatsStore>>,
    persistence: PersistenceWriter,
}

impl HandoffCoordinator {
    /// Create a coordinator
    pub fn new(config: HandoffConfig) -> Self {
        let lock_timeout = config.lock_timeout();
        Self {
            config,
            lock_timeout,
            conversations: DashMap::new(),
            events: Mutex::new(VecDeque::new()),
            stats: None,
            persistence: PersistenceWriter::disabled(),
        }
    }

    /// Emit a `handoff.execute` sample into `stats` for every allowed handoff
    pub fn with_stats(mut self, stats: Arc<RollingStatsStore>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_persistence(mut self, writer: PersistenceWriter) -> Self {
        self.persistence = writer;
        self
    }

    /// Override the per-conversation lock wait
    pub fn with_lock_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    /// Decide a handoff request.
    ///
    /// Waits at most the lock timeout for the conversation; a timed-out wait is a
    /// rejection with [`BlockReason::LockTimeout`].
    pub async fn request_handoff(&self, request: HandoffRequest) -> HandoffDecision {
        let started = Instant::now();
        let slot = self.slot(&request.conversation_id);

        let mut history = match tokio::time::timeout(self.lock_timeout, slot.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!(
                    conversation_id = %request.conversation_id,
                    "Handoff lock not acquired within {:?}",
                    self.lock_timeout
                );
                let record =
                    HandoffRecord::decided(&request, HandoffOutcome::Blocked(BlockReason::LockTimeout));
                let decision = decision_for(&record);
                self.log_event(record);
                return decision;
            }
        };

        let outcome = match self.check(&history, &request) {
            Some(reason) => {
                info!(
                    conversation_id = %request.conversation_id,
                    source = %request.source_agent,
                    target = %request.target_agent,
                    reason = %reason,
                    "Handoff blocked"
                );
                HandoffOutcome::Blocked(reason)
            }
            None => {
                debug!(
                    conversation_id = %request.conversation_id,
                    source = %request.source_agent,
                    target = %request.target_agent,
                    "Handoff allowed"
                );
                HandoffOutcome::Allowed
            }
        };

        let record = HandoffRecord::decided(&request, outcome);
        history.push(record.clone());
        drop(history);

        let decision = decision_for(&record);
        self.log_event(record);

        if decision.allowed {
            if let Some(stats) = &self.stats {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                stats.record(
                    Sample::new(
                        request.source_agent.clone(),
                        HANDOFF_OPERATION,
                        elapsed_ms,
                        true,
                        false,
                    )
                    .at(request.requested_at),
                );
            }
        }

        decision
    }

    /// Report the execution result of an allowed handoff
    pub async fn complete_handoff(
        &self,
        conversation_id: &str,
        handoff_id: &str,
        success: bool,
    ) -> Result<HandoffRecord> {
        self.complete_handoff_at(conversation_id, handoff_id, success, Utc::now())
            .await
    }

    pub async fn complete_handoff_at(
        &self,
        conversation_id: &str,
        handoff_id: &str,
        success: bool,
        at: DateTime<Utc>,
    ) -> Result<HandoffRecord> {
        let slot = self
            .conversations
            .get(conversation_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                SentinelError::not_found(format!("Conversation {} not found", conversation_id))
            })?;

        let mut history = tokio::time::timeout(self.lock_timeout, slot.lock_owned())
            .await
            .map_err(|_| {
                SentinelError::Internal(format!(
                    "Timed out waiting for conversation {}",
                    conversation_id
                ))
            })?;

        if history.find_completion(handoff_id).is_some() {
            return Err(SentinelError::Conflict(format!(
                "Handoff {} already completed",
                handoff_id
            )));
        }

        let record = history
            .find_allowed(handoff_id)
            .map(|allowed| allowed.completed(success, at))
            .ok_or_else(|| SentinelError::not_found(format!("Handoff {} not found", handoff_id)))?;

        history.push(record.clone());
        drop(history);

        if success {
            debug!(conversation_id, handoff_id, "Handoff executed");
        } else {
            warn!(conversation_id, handoff_id, "Handoff failed");
        }

        self.log_event(record.clone());
        Ok(record)
    }

    /// Records of one conversation in arrival order
    pub async fn history(&self, conversation_id: &str) -> Vec<HandoffRecord> {
        let slot = self
            .conversations
            .get(conversation_id)
            .map(|entry| Arc::clone(entry.value()));

        match slot {
            Some(slot) => slot.lock().await.records(),
            None => Vec::new(),
        }
    }

    /// Outcomes of every decision and completion recorded at or after `since`
    pub fn outcome_counts(&self, since: DateTime<Utc>) -> OutcomeCounts {
        let events = self.events.lock();
        let mut counts = OutcomeCounts::default();
        for record in events.iter().filter(|r| r.recorded_at >= since) {
            counts.observe(&record.outcome);
        }
        counts
    }

    /// Number of conversations with retained history
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Drop history older than the retention period.
    ///
    /// Conversations that are locked at the time are skipped until the next pass.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now
            .checked_sub_signed(self.config.history_retention())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut removed = 0;

        {
            let mut events = self.events.lock();
            let before = events.len();
            events.retain(|r| r.recorded_at >= cutoff);
            removed += before - events.len();
        }

        self.conversations.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(mut history) => {
                    removed += history.prune(cutoff);
                    !history.is_empty()
                }
                Err(_) => true,
            }
        });

        if removed > 0 {
            debug!("Pruned {} handoff records", removed);
        }
        removed
    }

    pub(super) fn slot(&self, conversation_id: &str) -> ConversationSlot {
        self.conversations
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    /// First failing check, in policy order
    fn check(&self, history: &ConversationHistory, request: &HandoffRequest) -> Option<BlockReason> {
        let now = request.requested_at;

        if request.source_agent == request.target_agent {
            return Some(BlockReason::SelfHandoff);
        }

        let circular_since = now - self.config.circular_window();
        if history.has_transfer_since(&request.target_agent, &request.source_agent, circular_since) {
            return Some(BlockReason::Circular);
        }

        if history.allowed_since(now - Duration::hours(1)) >= self.config.hourly_limit as usize {
            return Some(BlockReason::RateLimitHourly);
        }

        if history.allowed_since(now - Duration::hours(24)) >= self.config.daily_limit as usize {
            return Some(BlockReason::RateLimitDaily);
        }

        // NaN scores fail the gate
        if request.confidence_score.is_nan()
            || request.confidence_score < self.config.confidence_threshold
        {
            return Some(BlockReason::LowConfidence);
        }

        None
    }

    fn log_event(&self, record: HandoffRecord) {
        if self.persistence.is_enabled() {
            self.persistence.submit(PersistRecord::Handoff(record.clone()));
        }
        self.events.lock().push_back(record);
    }
}

fn decision_for(record: &HandoffRecord) -> HandoffDecision {
    let reason = match record.outcome {
        HandoffOutcome::Blocked(reason) => Some(reason),
        _ => None,
    };
    HandoffDecision {
        allowed: record.outcome == HandoffOutcome::Allowed,
        reason,
        handoff_id: record.handoff_id.clone(),
        conversation_id: record.conversation_id.clone(),
    }
}
