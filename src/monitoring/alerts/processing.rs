//! Rule evaluation and notification dispatch

use super::manager::AlertEngine;
use super::types::{Alert, AlertEvent, AlertSeverity, AlertStatus, Dispatch, EscalationState};
use crate::monitoring::metrics::SystemSummary;
use crate::utils::error::{Result, SentinelError};
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

impl AlertEngine {
    /// Evaluate every enabled rule against a summary snapshot.
    ///
    /// Returns alerts that were created or renewed; their notifications are queued
    /// for [`AlertEngine::process_pending`]. Time is taken from the summary, so the
    /// same snapshot always produces the same decisions.
    pub fn evaluate(&self, summary: &SystemSummary) -> Vec<Alert> {
        if !self.config.enabled {
            return Vec::new();
        }

        let now = summary.generated_at;
        let mut fired = Vec::new();
        let mut resolved = Vec::new();
        let mut escalations = Vec::new();
        let mut dispatches = Vec::new();
        let mut events = Vec::new();

        {
            let mut storage = self.storage.write();
            let rules: Vec<_> = storage
                .rules
                .values()
                .filter(|rule| rule.enabled)
                .cloned()
                .collect();

            for rule in rules {
                let matched = rule.condition.evaluate(summary, &self.sla, rule.min_samples);
                let state = storage.rule_state.entry(rule.name.clone()).or_default().clone();

                let Some(matched) = matched else {
                    // Condition cleared
                    let mut next = state.clone();
                    next.suppressed = false;
                    next.suppressed_subject = None;
                    next.open_alert_id = None;
                    storage.rule_state.insert(rule.name.clone(), next);

                    if let Some(alert_id) = state.open_alert_id {
                        if let Some(alert) = self.close_alert(&mut storage, &alert_id, now) {
                            info!("Alert {} ({}) resolved", alert.id, alert.rule_name);
                            resolved.push(alert);
                        }
                    }
                    storage.escalations.retain(|_, e| e.rule_name != rule.name);
                    continue;
                };

                if state.suppressed {
                    if state.suppressed_subject == matched.subject {
                        continue;
                    }
                    debug!(
                        "Rule {} now matches {:?}; acknowledgement covered {:?}",
                        rule.name, matched.subject, state.suppressed_subject
                    );
                    if let Some(state) = storage.rule_state.get_mut(&rule.name) {
                        state.suppressed = false;
                        state.suppressed_subject = None;
                    }
                }

                let cooled_down = state
                    .last_dispatch
                    .is_none_or(|last| now - last >= rule.cooldown());

                match state.open_alert_id.clone() {
                    Some(alert_id) if cooled_down => {
                        let Some(alert) = storage.active.get_mut(&alert_id) else {
                            continue;
                        };
                        alert.value = matched.value;
                        alert.threshold = matched.threshold;
                        alert.subject = matched.subject.clone();
                        alert.message = matched.message.clone();
                        alert.last_dispatched_at = now;
                        alert.notifications += 1;
                        let renewed = alert.clone();

                        if let Some(state) = storage.rule_state.get_mut(&rule.name) {
                            state.last_dispatch = Some(now);
                        }
                        storage.stats.renewals += 1;

                        debug!("Alert {} ({}) renewed", renewed.id, renewed.rule_name);
                        dispatches.push(Dispatch {
                            alert: renewed.clone(),
                            channels: rule.channels.clone(),
                        });
                        events.push(AlertEvent::Renewed(renewed.clone()));
                        fired.push(renewed);
                    }
                    Some(_) => {
                        storage.stats.suppressed_by_cooldown += 1;
                    }
                    None if cooled_down => {
                        let alert = Alert {
                            id: uuid::Uuid::new_v4().to_string(),
                            rule_name: rule.name.clone(),
                            severity: rule.severity,
                            status: AlertStatus::Active,
                            message: matched.message,
                            value: matched.value,
                            threshold: matched.threshold,
                            subject: matched.subject,
                            channels: rule.channels.clone(),
                            triggered_at: now,
                            last_dispatched_at: now,
                            notifications: 1,
                            escalation_level: 1,
                            acknowledged: false,
                            acknowledged_by: None,
                            acknowledged_at: None,
                            resolved_at: None,
                        };

                        storage.active.insert(alert.id.clone(), alert.clone());
                        if let Some(state) = storage.rule_state.get_mut(&rule.name) {
                            state.open_alert_id = Some(alert.id.clone());
                            state.last_dispatch = Some(now);
                        }

                        if alert.severity == AlertSeverity::Critical && self.config.escalation.enabled {
                            let escalation = EscalationState::new(&alert);
                            storage
                                .escalations
                                .insert(alert.id.clone(), escalation.clone());
                            escalations.push(escalation);
                        }

                        let stats = &mut storage.stats;
                        stats.total_alerts += 1;
                        *stats
                            .alerts_by_severity
                            .entry(alert.severity.to_string())
                            .or_insert(0) += 1;
                        *stats.alerts_by_rule.entry(rule.name.clone()).or_insert(0) += 1;
                        stats.last_alert = Some(now);

                        warn!(
                            rule = %rule.name,
                            severity = %alert.severity,
                            "Alert triggered: {}",
                            alert.message
                        );
                        dispatches.push(Dispatch {
                            alert: alert.clone(),
                            channels: rule.channels.clone(),
                        });
                        events.push(AlertEvent::Triggered(alert.clone()));
                        fired.push(alert);
                    }
                    None => {
                        // Closed recently; the rule is still cooling down
                        storage.stats.suppressed_by_cooldown += 1;
                    }
                }
            }
        }

        self.pending.lock().extend(dispatches);

        for alert in fired.iter().chain(resolved.iter()) {
            self.persist_alert(alert);
        }
        for escalation in &escalations {
            self.persist_escalation(escalation);
        }
        for event in events {
            self.publish(event);
        }
        for alert in resolved {
            self.publish(AlertEvent::Resolved(alert));
        }

        fired
    }

    /// Deliver every queued notification.
    ///
    /// Each channel is attempted independently; a failing channel is counted and
    /// logged without affecting the others. Returns the number of successful sends.
    pub async fn process_pending(&self) -> Result<usize> {
        let dispatches: Vec<Dispatch> = {
            let mut pending = self.pending.lock();
            pending.drain(..).collect()
        };

        let mut delivered = 0;
        for dispatch in dispatches {
            delivered += self.dispatch(&dispatch).await;
        }
        Ok(delivered)
    }

    async fn dispatch(&self, dispatch: &Dispatch) -> usize {
        debug!(
            "Dispatching alert {} to {} channels",
            dispatch.alert.id,
            dispatch.channels.len()
        );

        let resolved: Vec<_> = {
            let channels = self.channels.read();
            dispatch
                .channels
                .iter()
                .map(|id| (id.clone(), channels.get(id).cloned()))
                .collect()
        };

        let sends = resolved.into_iter().map(|(id, channel)| {
            let alert = &dispatch.alert;
            async move {
                let result = match channel {
                    Some(channel) if channel.supports_severity(alert.severity) => {
                        channel.send(alert).await
                    }
                    Some(_) => return (id, None),
                    None => Err(SentinelError::notification(format!(
                        "Channel {} is not registered",
                        id
                    ))),
                };
                (id, Some(result))
            }
        });
        let results = join_all(sends).await;

        let now = Utc::now();
        let mut delivered = 0;
        let mut storage = self.storage.write();
        let stats = &mut storage.stats;
        for (id, result) in results {
            let Some(result) = result else {
                continue;
            };
            let channel_stats = stats.channels.entry(id.clone()).or_default();
            match result {
                Ok(()) => {
                    channel_stats.sent += 1;
                    channel_stats.last_sent_at = Some(now);
                    stats.notifications_sent += 1;
                    delivered += 1;
                    debug!("Alert {} sent via {}", dispatch.alert.id, id);
                }
                Err(e) => {
                    channel_stats.failed += 1;
                    channel_stats.last_error = Some(e.to_string());
                    stats.failed_notifications += 1;
                    warn!("Failed to send alert {} via {}: {}", dispatch.alert.id, id, e);
                }
            }
        }
        delivered
    }
}
