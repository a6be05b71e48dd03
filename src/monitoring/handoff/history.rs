//! Per-conversation handoff history

use super::types::{HandoffOutcome, HandoffRecord};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Records of one conversation in arrival order
#[derive(Debug, Default)]
pub(super) struct ConversationHistory {
    records: VecDeque<HandoffRecord>,
}

impl ConversationHistory {
    pub(super) fn push(&mut self, record: HandoffRecord) {
        self.records.push_back(record);
    }

    /// Allowed handoffs recorded at or after `since`
    pub(super) fn allowed_since(&self, since: DateTime<Utc>) -> usize {
        self.records
            .iter()
            .filter(|r| r.is_allowed() && r.recorded_at >= since)
            .count()
    }

    /// Whether `from → to` was allowed at or after `since`
    pub(super) fn has_transfer_since(&self, from: &str, to: &str, since: DateTime<Utc>) -> bool {
        self.records.iter().any(|r| {
            r.is_allowed() && r.source_agent == from && r.target_agent == to && r.recorded_at >= since
        })
    }

    /// The allowed record with this id
    pub(super) fn find_allowed(&self, handoff_id: &str) -> Option<&HandoffRecord> {
        self.records
            .iter()
            .find(|r| r.handoff_id == handoff_id && r.is_allowed())
    }

    /// The completion record for this id, if the handoff already finished
    pub(super) fn find_completion(&self, handoff_id: &str) -> Option<&HandoffRecord> {
        self.records
            .iter()
            .find(|r| r.handoff_id == handoff_id && r.outcome.is_completion())
    }

    pub(super) fn records(&self) -> Vec<HandoffRecord> {
        self.records.iter().cloned().collect()
    }

    /// Drop records older than `cutoff`, returning how many were removed
    pub(super) fn prune(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.recorded_at >= cutoff);
        before - self.records.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    pub(super) fn len_with(&self, outcome: HandoffOutcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }
}
