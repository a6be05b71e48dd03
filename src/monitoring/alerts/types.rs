//! Alert types and data structures

use super::conditions::AlertCondition;
use crate::config::default_cooldown_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => f.write_str("warning"),
            AlertSeverity::Critical => f.write_str("critical"),
        }
    }
}

/// Alert rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique rule name
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: AlertSeverity,
    pub condition: AlertCondition,
    /// Channel ids notified at level 1
    #[serde(default)]
    pub channels: Vec<String>,
    /// Minimum seconds between notifications for one open alert
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
    #[serde(default = "crate::config::default_true")]
    pub enabled: bool,
    /// Samples (or handoff attempts) required before the condition is judged
    #[serde(default)]
    pub min_samples: usize,
}

impl AlertRule {
    pub fn new(name: impl Into<String>, severity: AlertSeverity, condition: AlertCondition) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            severity,
            condition,
            channels: Vec::new(),
            cooldown_seconds: default_cooldown_seconds(),
            enabled: true,
            min_samples: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the notified channels; duplicates are dropped
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels.clear();
        for channel in channels {
            let channel = channel.into();
            if !self.channels.contains(&channel) {
                self.channels.push(channel);
            }
        }
        self
    }

    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_seconds as i64)
    }
}

/// Lifecycle state of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

/// A triggered alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_name: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub message: String,
    /// Offending value and the threshold it crossed
    pub value: f64,
    pub threshold: f64,
    /// Operation or agent the condition matched on, if any
    pub subject: Option<String>,
    pub channels: Vec<String>,
    pub triggered_at: DateTime<Utc>,
    pub last_dispatched_at: DateTime<Utc>,
    /// Notifications sent so far, including renewals
    pub notifications: u32,
    /// Escalation level the alert is being delivered at
    pub escalation_level: u8,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn is_open(&self) -> bool {
        self.status == AlertStatus::Active
    }
}

/// Escalation ladder position of one critical alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationState {
    pub alert_id: String,
    pub rule_name: String,
    /// 1, 2 or 3
    pub level: u8,
    pub triggered_at: DateTime<Utc>,
    pub entered_level_at: DateTime<Utc>,
    /// Set on acknowledgement; a frozen ladder never advances
    pub frozen: bool,
}

impl EscalationState {
    pub(super) fn new(alert: &Alert) -> Self {
        Self {
            alert_id: alert.id.clone(),
            rule_name: alert.rule_name.clone(),
            level: 1,
            triggered_at: alert.triggered_at,
            entered_level_at: alert.triggered_at,
            frozen: false,
        }
    }
}

/// Change notifications published by the engine
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum AlertEvent {
    Triggered(Alert),
    Renewed(Alert),
    Escalated(EscalationState),
    Acknowledged(Alert),
    Resolved(Alert),
}

impl AlertEvent {
    pub fn alert_id(&self) -> &str {
        match self {
            AlertEvent::Triggered(a)
            | AlertEvent::Renewed(a)
            | AlertEvent::Acknowledged(a)
            | AlertEvent::Resolved(a) => &a.id,
            AlertEvent::Escalated(e) => &e.alert_id,
        }
    }
}

/// Delivery counters of one channel
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ChannelDeliveryStats {
    pub sent: u64,
    pub failed: u64,
    pub last_error: Option<String>,
    pub last_sent_at: Option<DateTime<Utc>>,
}

/// Alert statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct AlertStats {
    /// Alerts created
    pub total_alerts: u64,
    /// Re-notifications of open alerts after cooldown
    pub renewals: u64,
    pub alerts_by_severity: BTreeMap<String, u64>,
    pub alerts_by_rule: BTreeMap<String, u64>,
    /// Evaluations where an open alert was held back by cooldown
    pub suppressed_by_cooldown: u64,
    pub acknowledged: u64,
    pub resolved: u64,
    pub escalations: u64,
    pub notifications_sent: u64,
    pub failed_notifications: u64,
    pub channels: BTreeMap<String, ChannelDeliveryStats>,
    pub last_alert: Option<DateTime<Utc>>,
}

/// A queued notification
#[derive(Debug, Clone)]
pub(super) struct Dispatch {
    pub alert: Alert,
    pub channels: Vec<String>,
}

/// Per-rule evaluation state
#[derive(Debug, Default, Clone)]
pub(super) struct RuleState {
    pub open_alert_id: Option<String>,
    pub last_dispatch: Option<DateTime<Utc>>,
    /// Acknowledged while still true; cleared once the condition clears
    pub suppressed: bool,
    /// Subject of the acknowledged alert; a match on another subject fires again
    pub suppressed_subject: Option<String>,
}

/// Consolidated alert storage - single lock for related data
#[derive(Debug, Default)]
pub(super) struct AlertStorage {
    pub rules: BTreeMap<String, AlertRule>,
    pub rule_state: HashMap<String, RuleState>,
    pub active: BTreeMap<String, Alert>,
    pub escalations: BTreeMap<String, EscalationState>,
    pub history: VecDeque<Alert>,
    pub stats: AlertStats,
}

/// Union of two channel lists, order preserved
pub(super) fn merge_channels(first: &[String], second: &[String]) -> Vec<String> {
    let mut merged = first.to_vec();
    for channel in second {
        if !merged.contains(channel) {
            merged.push(channel.clone());
        }
    }
    merged
}
