//! Handoff request, decision and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Operation name of the sample emitted for every allowed handoff
pub const HANDOFF_OPERATION: &str = "handoff.execute";

/// A proposed transfer of a conversation between agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub conversation_id: String,
    pub source_agent: String,
    pub target_agent: String,
    pub confidence_score: f64,
    pub requested_at: DateTime<Utc>,
}

impl HandoffRequest {
    /// Create a request timestamped now
    pub fn new(
        conversation_id: impl Into<String>,
        source_agent: impl Into<String>,
        target_agent: impl Into<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            source_agent: source_agent.into(),
            target_agent: target_agent.into(),
            confidence_score,
            requested_at: Utc::now(),
        }
    }

    /// Override the request time
    pub fn at(mut self, requested_at: DateTime<Utc>) -> Self {
        self.requested_at = requested_at;
        self
    }
}

/// Why a handoff was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    SelfHandoff,
    Circular,
    RateLimitHourly,
    RateLimitDaily,
    LowConfidence,
    LockTimeout,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::SelfHandoff => "self_handoff",
            BlockReason::Circular => "circular",
            BlockReason::RateLimitHourly => "rate_limit_hourly",
            BlockReason::RateLimitDaily => "rate_limit_daily",
            BlockReason::LowConfidence => "low_confidence",
            BlockReason::LockTimeout => "lock_timeout",
        }
    }

    /// Whether the rejection came from a rate limit
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, BlockReason::RateLimitHourly | BlockReason::RateLimitDaily)
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a handoff request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffDecision {
    pub allowed: bool,
    pub reason: Option<BlockReason>,
    /// Id of the record written for this decision
    pub handoff_id: String,
    pub conversation_id: String,
}

impl HandoffDecision {
    /// Whether the decision was a rejection for `reason`
    pub fn is_blocked_for(&self, reason: BlockReason) -> bool {
        self.reason == Some(reason)
    }
}

/// State carried by a handoff record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum HandoffOutcome {
    Allowed,
    Blocked(BlockReason),
    Executed,
    Failed,
}

impl HandoffOutcome {
    /// Whether this record reports the end of an allowed handoff
    pub fn is_completion(&self) -> bool {
        matches!(self, HandoffOutcome::Executed | HandoffOutcome::Failed)
    }
}

/// Immutable history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub handoff_id: String,
    pub conversation_id: String,
    pub source_agent: String,
    pub target_agent: String,
    pub confidence_score: f64,
    pub recorded_at: DateTime<Utc>,
    pub outcome: HandoffOutcome,
}

impl HandoffRecord {
    pub(super) fn decided(request: &HandoffRequest, outcome: HandoffOutcome) -> Self {
        Self {
            handoff_id: uuid::Uuid::new_v4().to_string(),
            conversation_id: request.conversation_id.clone(),
            source_agent: request.source_agent.clone(),
            target_agent: request.target_agent.clone(),
            confidence_score: request.confidence_score,
            recorded_at: request.requested_at,
            outcome,
        }
    }

    pub(super) fn completed(&self, success: bool, at: DateTime<Utc>) -> Self {
        Self {
            recorded_at: at,
            outcome: if success {
                HandoffOutcome::Executed
            } else {
                HandoffOutcome::Failed
            },
            ..self.clone()
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome == HandoffOutcome::Allowed
    }
}

/// Handoff outcomes observed since some instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    /// Decisions made, allowed or blocked
    pub attempts: u64,
    pub allowed: u64,
    pub executed: u64,
    pub failed: u64,
    pub blocked_by_reason: BTreeMap<BlockReason, u64>,
}

impl OutcomeCounts {
    pub(super) fn observe(&mut self, outcome: &HandoffOutcome) {
        match outcome {
            HandoffOutcome::Allowed => {
                self.attempts += 1;
                self.allowed += 1;
            }
            HandoffOutcome::Blocked(reason) => {
                self.attempts += 1;
                *self.blocked_by_reason.entry(*reason).or_insert(0) += 1;
            }
            HandoffOutcome::Executed => self.executed += 1,
            HandoffOutcome::Failed => self.failed += 1,
        }
    }

    pub fn blocked(&self) -> u64 {
        self.blocked_by_reason.values().sum()
    }

    pub fn blocked_for(&self, reason: BlockReason) -> u64 {
        self.blocked_by_reason.get(&reason).copied().unwrap_or(0)
    }

    /// Rejections caused by either rate limit
    pub fn rate_limited(&self) -> u64 {
        self.blocked_by_reason
            .iter()
            .filter(|(reason, _)| reason.is_rate_limit())
            .map(|(_, count)| count)
            .sum()
    }

    /// `executed / (executed + failed)`, 1.0 when nothing has completed
    pub fn success_rate(&self) -> f64 {
        let completed = self.executed + self.failed;
        if completed == 0 {
            1.0
        } else {
            self.executed as f64 / completed as f64
        }
    }
}
