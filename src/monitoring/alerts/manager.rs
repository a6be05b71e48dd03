//! Alert engine implementation

use super::channels::{build_channel, NotificationChannel};
use super::rules::default_rules;
use super::types::{
    Alert, AlertEvent, AlertRule, AlertStats, AlertStatus, AlertStorage, Dispatch, EscalationState,
};
use crate::config::AlertingConfig;
use crate::monitoring::metrics::SlaTargets;
use crate::monitoring::persistence::{PersistRecord, PersistenceWriter};
use crate::monitoring::stats::BoundedPush;
use crate::utils::error::{Result, SentinelError};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 256;

/// Evaluates rules, queues notifications and runs the escalation ladder
#[derive(Debug)]
pub struct AlertEngine {
    pub(super) config: AlertingConfig,
    pub(super) sla: SlaTargets,
    /// Consolidated storage for all alert-related data
    pub(super) storage: Arc<RwLock<AlertStorage>>,
    /// Notifications waiting for `process_pending`
    pub(super) pending: Arc<Mutex<VecDeque<Dispatch>>>,
    pub(super) channels: Arc<RwLock<BTreeMap<String, Arc<dyn NotificationChannel>>>>,
    pub(super) events: broadcast::Sender<AlertEvent>,
    pub(super) persistence: PersistenceWriter,
}

impl AlertEngine {
    /// Create an engine with the configured rules and channels
    pub fn new(config: &AlertingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        let mut channels = BTreeMap::new();
        for channel_config in &config.channels {
            let channel = build_channel(channel_config, client.clone())?;
            channels.insert(channel.id().to_string(), channel);
        }

        let mut storage = AlertStorage::default();
        if config.use_default_rules {
            for rule in default_rules(&config.default_rule_channels) {
                storage.rules.insert(rule.name.clone(), rule);
            }
        }
        // Configured rules replace built-in rules of the same name
        for rule in &config.rules {
            storage.rules.insert(rule.name.clone(), rule.clone());
        }

        info!(
            "Alert engine configured with {} rules and {} channels",
            storage.rules.len(),
            channels.len()
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            config: config.clone(),
            sla: SlaTargets::from(config),
            storage: Arc::new(RwLock::new(storage)),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            channels: Arc::new(RwLock::new(channels)),
            events,
            persistence: PersistenceWriter::disabled(),
        })
    }

    pub fn with_persistence(mut self, writer: PersistenceWriter) -> Self {
        self.persistence = writer;
        self
    }

    pub fn config(&self) -> &AlertingConfig {
        &self.config
    }

    /// Add an alert rule
    pub fn add_rule(&self, rule: AlertRule) -> Result<()> {
        let mut storage = self.storage.write();
        if storage.rules.contains_key(&rule.name) {
            return Err(SentinelError::Conflict(format!(
                "Alert rule {} already exists",
                rule.name
            )));
        }
        info!("Added alert rule {}", rule.name);
        storage.rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Remove an alert rule, closing any alert it has open
    pub fn remove_rule(&self, name: &str) -> Result<AlertRule> {
        let mut storage = self.storage.write();
        let rule = storage
            .rules
            .remove(name)
            .ok_or_else(|| SentinelError::not_found(format!("Alert rule {} not found", name)))?;

        let closed = storage
            .rule_state
            .remove(name)
            .and_then(|state| state.open_alert_id)
            .and_then(|alert_id| self.close_alert(&mut storage, &alert_id, Utc::now()));
        storage.escalations.retain(|_, e| e.rule_name != name);
        drop(storage);

        info!("Removed alert rule {}", name);
        if let Some(alert) = closed {
            self.persist_alert(&alert);
            self.publish(AlertEvent::Resolved(alert));
        }
        Ok(rule)
    }

    pub fn enable_rule(&self, name: &str) -> Result<()> {
        self.set_rule_enabled(name, true).map(|_| ())
    }

    /// Disable a rule, resolving any alert it has open and stopping its escalation
    pub fn disable_rule(&self, name: &str) -> Result<()> {
        let closed = self.set_rule_enabled(name, false)?;
        if let Some(alert) = closed {
            info!("Alert {} resolved because rule {} was disabled", alert.id, name);
            self.persist_alert(&alert);
            self.publish(AlertEvent::Resolved(alert));
        }
        Ok(())
    }

    fn set_rule_enabled(&self, name: &str, enabled: bool) -> Result<Option<Alert>> {
        let mut storage = self.storage.write();
        let rule = storage
            .rules
            .get_mut(name)
            .ok_or_else(|| SentinelError::not_found(format!("Alert rule {} not found", name)))?;
        rule.enabled = enabled;
        debug!("Alert rule {} enabled={}", name, enabled);
        if enabled {
            return Ok(None);
        }

        let open = storage.rule_state.get_mut(name).and_then(|state| {
            state.suppressed = false;
            state.suppressed_subject = None;
            state.open_alert_id.take()
        });
        let closed = open.and_then(|alert_id| self.close_alert(&mut storage, &alert_id, Utc::now()));
        storage.escalations.retain(|_, e| e.rule_name != name);
        Ok(closed)
    }

    /// Rules sorted by name
    pub fn list_rules(&self) -> Vec<AlertRule> {
        self.storage.read().rules.values().cloned().collect()
    }

    /// Acknowledge an open alert, freezing its escalation
    pub fn acknowledge(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        self.acknowledge_at(alert_id, actor, Utc::now())
    }

    pub fn acknowledge_at(&self, alert_id: &str, actor: &str, now: DateTime<Utc>) -> Result<Alert> {
        let mut storage = self.storage.write();

        let Some(mut alert) = storage.active.remove(alert_id) else {
            let closed = storage.history.iter().any(|a| a.id == alert_id);
            return Err(if closed {
                SentinelError::Conflict(format!("Alert {} is no longer open", alert_id))
            } else {
                SentinelError::not_found(format!("Alert {} not found", alert_id))
            });
        };

        alert.status = AlertStatus::Acknowledged;
        alert.acknowledged = true;
        alert.acknowledged_by = Some(actor.to_string());
        alert.acknowledged_at = Some(now);

        if let Some(state) = storage.rule_state.get_mut(&alert.rule_name) {
            state.open_alert_id = None;
            state.suppressed = true;
            state.suppressed_subject = alert.subject.clone();
        }

        let frozen = storage.escalations.get_mut(alert_id).map(|escalation| {
            escalation.frozen = true;
            escalation.clone()
        });

        storage.stats.acknowledged += 1;
        self.push_history(&mut storage, alert.clone());
        drop(storage);

        info!("Alert {} ({}) acknowledged by {}", alert.id, alert.rule_name, actor);
        self.persist_alert(&alert);
        if let Some(escalation) = frozen {
            self.persist_escalation(&escalation);
        }
        self.publish(AlertEvent::Acknowledged(alert.clone()));
        Ok(alert)
    }

    /// Open alerts, oldest first
    pub fn get_active_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<_> = self.storage.read().active.values().cloned().collect();
        alerts.sort_by(|a, b| a.triggered_at.cmp(&b.triggered_at).then(a.id.cmp(&b.id)));
        alerts
    }

    /// Ladder position of every tracked critical alert
    pub fn get_escalation_status(&self) -> Vec<EscalationState> {
        self.storage.read().escalations.values().cloned().collect()
    }

    /// Closed alerts, newest first
    pub fn get_history(&self, limit: usize) -> Vec<Alert> {
        self.storage
            .read()
            .history
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get_stats(&self) -> AlertStats {
        self.storage.read().stats.clone()
    }

    /// Stream of alert lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    /// Add or replace a channel
    pub fn register_channel(&self, channel: Arc<dyn NotificationChannel>) {
        debug!("Registered {} channel {}", channel.kind(), channel.id());
        self.channels
            .write()
            .insert(channel.id().to_string(), channel);
    }

    pub fn channel_ids(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    /// Notifications waiting to be dispatched
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Move an open alert to history as resolved
    pub(super) fn close_alert(
        &self,
        storage: &mut AlertStorage,
        alert_id: &str,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let mut alert = storage.active.remove(alert_id)?;
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(now);
        storage.escalations.remove(alert_id);
        storage.stats.resolved += 1;
        self.push_history(storage, alert.clone());
        Some(alert)
    }

    pub(super) fn push_history(&self, storage: &mut AlertStorage, alert: Alert) {
        storage
            .history
            .push_bounded(alert, self.config.history_limit);
    }

    pub(super) fn publish(&self, event: AlertEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    pub(super) fn persist_alert(&self, alert: &Alert) {
        if self.persistence.is_enabled() {
            self.persistence.submit(PersistRecord::Alert(alert.clone()));
        }
    }

    pub(super) fn persist_escalation(&self, escalation: &EscalationState) {
        if self.persistence.is_enabled() {
            self.persistence
                .submit(PersistRecord::Escalation(escalation.clone()));
        }
    }
}
