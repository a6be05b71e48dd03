//! Escalation ladder
//!
//! Level 1 is the rule's own channels at trigger time. Unacknowledged critical alerts
//! move to level 2 (rule channels plus the level-2 superset) once the level-2 delay has
//! passed since the trigger, then to level 3 (incident channels) after the level-3
//! delay. Each sweep advances an alert by at most one level.

use super::manager::AlertEngine;
use super::types::{merge_channels, AlertEvent, Dispatch, EscalationState};
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

impl AlertEngine {
    /// Advance every eligible ladder by one level.
    ///
    /// Each advance is applied, queued for dispatch and handed to persistence while the
    /// storage lock is held, so a concurrent acknowledgement observes either the old or
    /// the new level, never a partial one.
    pub fn run_escalation_sweep(&self, now: DateTime<Utc>) -> Vec<EscalationState> {
        let config = &self.config.escalation;
        if !config.enabled {
            return Vec::new();
        }

        let level2_delay = Duration::seconds(config.level2_delay_seconds as i64);
        let level3_delay = Duration::seconds(config.level3_delay_seconds as i64);
        let mut advanced = Vec::new();

        let mut storage = self.storage.write();
        let ids: Vec<String> = storage.escalations.keys().cloned().collect();

        for alert_id in ids {
            let Some(escalation) = storage.escalations.get(&alert_id) else {
                continue;
            };
            if escalation.frozen || escalation.level >= 3 {
                continue;
            }
            let rule_enabled = storage
                .rules
                .get(&escalation.rule_name)
                .is_some_and(|rule| rule.enabled);
            if !rule_enabled {
                continue;
            }

            let elapsed = now - escalation.triggered_at;
            let next_level = match escalation.level {
                1 if elapsed >= level2_delay => 2,
                2 if elapsed >= level3_delay => 3,
                _ => continue,
            };

            let Some(alert) = storage.active.get(&alert_id) else {
                continue;
            };
            if alert.acknowledged {
                continue;
            }

            let channels = if next_level == 2 {
                merge_channels(&alert.channels, &config.level2_channels)
            } else if config.level3_channels.is_empty() {
                warn!(
                    "No level 3 channels configured; alert {} re-sent to level 2 channels",
                    alert_id
                );
                merge_channels(&alert.channels, &config.level2_channels)
            } else {
                config.level3_channels.clone()
            };

            let mut notified = alert.clone();
            notified.escalation_level = next_level;

            let Some(escalation) = storage.escalations.get_mut(&alert_id) else {
                continue;
            };
            escalation.level = next_level;
            escalation.entered_level_at = now;
            let escalation = escalation.clone();

            if let Some(alert) = storage.active.get_mut(&alert_id) {
                alert.escalation_level = next_level;
            }
            storage.stats.escalations += 1;

            warn!(
                "Alert {} ({}) escalated to level {} after {}s unacknowledged",
                alert_id,
                notified.rule_name,
                next_level,
                elapsed.num_seconds()
            );

            self.pending.lock().push_back(Dispatch {
                alert: notified,
                channels,
            });
            self.persist_escalation(&escalation);
            advanced.push(escalation);
        }
        drop(storage);

        for escalation in &advanced {
            self.publish(AlertEvent::Escalated(escalation.clone()));
        }
        advanced
    }
}
