//! Alert engine integration tests

#[cfg(test)]
mod tests {
    use crate::common::{RecordingChannel, base_time, quiet_alerting_config};
    use chrono::{DateTime, Duration, Utc};
    use handoff_sentinel::config::AlertingConfig;
    use handoff_sentinel::monitoring::alerts::{
        AlertCondition, AlertEngine, AlertEvent, AlertRule, AlertSeverity,
    };
    use handoff_sentinel::monitoring::metrics::{HandoffSummary, Summary, SystemSummary};
    use handoff_sentinel::monitoring::persistence::{
        PersistRecord, PersistenceSink, PersistenceWriter,
    };
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::sync::watch;

    fn summary(error_rate: f64, at: DateTime<Utc>) -> SystemSummary {
        SystemSummary {
            window: "1h".to_string(),
            generated_at: at,
            overall: Summary {
                error_rate,
                total_count: 200,
                success_count: 200 - (error_rate * 200.0) as usize,
                ..Summary::default()
            },
            agents: BTreeMap::new(),
            operations: BTreeMap::new(),
            handoffs: HandoffSummary::default(),
        }
    }

    fn escalating_config() -> AlertingConfig {
        let mut config = quiet_alerting_config();
        config.escalation.level2_channels = vec!["oncall".to_string()];
        config.escalation.level3_channels = vec!["pager".to_string()];
        config
    }

    struct Channels {
        ops: Arc<RecordingChannel>,
        oncall: Arc<RecordingChannel>,
        pager: Arc<RecordingChannel>,
    }

    fn engine(config: &AlertingConfig, severity: AlertSeverity) -> (AlertEngine, Channels) {
        let engine = AlertEngine::new(config).unwrap();
        let channels = Channels {
            ops: RecordingChannel::new("ops"),
            oncall: RecordingChannel::new("oncall"),
            pager: RecordingChannel::new("pager"),
        };
        engine.register_channel(channels.ops.clone());
        engine.register_channel(channels.oncall.clone());
        engine.register_channel(channels.pager.clone());
        engine
            .add_rule(
                AlertRule::new(
                    "high_error_rate",
                    severity,
                    AlertCondition::ErrorRateAbove { threshold: 0.05 },
                )
                .with_channels(["ops"])
                .with_cooldown(300),
            )
            .unwrap();
        (engine, channels)
    }

    // ==================== Cooldown ====================

    #[tokio::test]
    async fn test_sustained_breach_renews_once_per_cooldown() {
        let (engine, channels) = engine(&quiet_alerting_config(), AlertSeverity::Warning);
        let start = base_time();

        // Evaluated every minute for twenty minutes
        for minute in 0..=20 {
            engine.evaluate(&summary(0.3, start + Duration::minutes(minute)));
            engine.process_pending().await.unwrap();
        }

        assert_eq!(channels.ops.count(), 5);
        let alerts = channels.ops.received();
        assert!(alerts.iter().all(|a| a.id == alerts[0].id));
        assert_eq!(alerts.last().unwrap().notifications, 5);

        let stats = engine.get_stats();
        assert_eq!(stats.total_alerts, 1);
        assert_eq!(stats.renewals, 4);
        assert_eq!(stats.suppressed_by_cooldown, 16);
        assert_eq!(stats.notifications_sent, 5);
        assert_eq!(engine.get_active_alerts().len(), 1);
    }

    // ==================== Escalation ====================

    #[tokio::test]
    async fn test_unacknowledged_critical_climbs_the_ladder() {
        let (engine, channels) = engine(&escalating_config(), AlertSeverity::Critical);
        let mut events = engine.subscribe();
        let start = base_time();

        let fired = engine.evaluate(&summary(0.3, start));
        assert_eq!(fired.len(), 1);
        engine.process_pending().await.unwrap();
        assert_eq!(channels.ops.count(), 1);

        assert!(engine.run_escalation_sweep(start + Duration::minutes(4)).is_empty());

        let advanced = engine.run_escalation_sweep(start + Duration::minutes(5));
        assert_eq!(advanced.len(), 1);
        assert_eq!(advanced[0].level, 2);
        engine.process_pending().await.unwrap();
        assert_eq!(channels.ops.count(), 2);
        assert_eq!(channels.oncall.count(), 1);
        assert_eq!(channels.oncall.received()[0].escalation_level, 2);

        assert!(engine.run_escalation_sweep(start + Duration::minutes(10)).is_empty());

        let advanced = engine.run_escalation_sweep(start + Duration::minutes(15));
        assert_eq!(advanced[0].level, 3);
        engine.process_pending().await.unwrap();
        assert_eq!(channels.pager.count(), 1);
        assert_eq!(channels.ops.count(), 2);

        // Top of the ladder
        assert!(engine.run_escalation_sweep(start + Duration::hours(2)).is_empty());
        assert_eq!(engine.get_escalation_status()[0].level, 3);

        // Clearing resolves the alert and retires its ladder
        engine.evaluate(&summary(0.0, start + Duration::minutes(16)));
        assert!(engine.get_active_alerts().is_empty());
        assert!(engine.get_escalation_status().is_empty());

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                AlertEvent::Triggered(_) => "triggered",
                AlertEvent::Renewed(_) => "renewed",
                AlertEvent::Escalated(_) => "escalated",
                AlertEvent::Acknowledged(_) => "acknowledged",
                AlertEvent::Resolved(_) => "resolved",
            });
        }
        assert_eq!(kinds, vec!["triggered", "escalated", "escalated", "resolved"]);
    }

    #[tokio::test]
    async fn test_acknowledgement_stops_escalation_until_clear() {
        let (engine, channels) = engine(&escalating_config(), AlertSeverity::Critical);
        let start = base_time();

        let alert = engine.evaluate(&summary(0.3, start)).remove(0);
        engine.run_escalation_sweep(start + Duration::minutes(5));
        engine.process_pending().await.unwrap();
        assert_eq!(channels.oncall.count(), 1);

        let acked = engine
            .acknowledge_at(&alert.id, "dana", start + Duration::minutes(6))
            .unwrap();
        assert_eq!(acked.acknowledged_by.as_deref(), Some("dana"));

        assert!(engine.run_escalation_sweep(start + Duration::minutes(30)).is_empty());
        let status = engine.get_escalation_status();
        assert_eq!(status.len(), 1);
        assert!(status[0].frozen);
        assert_eq!(status[0].level, 2);

        // Still breaching but acknowledged: nothing new
        assert!(engine.evaluate(&summary(0.3, start + Duration::minutes(40))).is_empty());

        // Clear, then breach again after the cooldown: a fresh alert
        engine.evaluate(&summary(0.0, start + Duration::minutes(41)));
        let refired = engine.evaluate(&summary(0.3, start + Duration::minutes(50)));
        assert_eq!(refired.len(), 1);
        assert_ne!(refired[0].id, alert.id);
        assert_eq!(engine.get_history(10)[0].id, alert.id);
        assert_eq!(channels.pager.count(), 0);
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let mut config = quiet_alerting_config();
        config.escalation.enabled = false;
        let engine = AlertEngine::new(&config).unwrap();
        let broken = RecordingChannel::failing("broken");
        let ops = RecordingChannel::new("ops");
        engine.register_channel(broken.clone());
        engine.register_channel(ops.clone());
        engine
            .add_rule(
                AlertRule::new(
                    "high_error_rate",
                    AlertSeverity::Critical,
                    AlertCondition::ErrorRateAbove { threshold: 0.05 },
                )
                .with_channels(["broken", "ops", "unregistered"]),
            )
            .unwrap();

        engine.evaluate(&summary(0.3, base_time()));
        assert_eq!(engine.process_pending().await.unwrap(), 1);
        assert_eq!(broken.count(), 1);
        assert_eq!(ops.count(), 1);

        let stats = engine.get_stats();
        assert_eq!(stats.notifications_sent, 1);
        assert_eq!(stats.failed_notifications, 2);
        assert!(stats.channels["broken"].last_error.is_some());
        assert!(engine.get_escalation_status().is_empty());
    }

    // ==================== Persistence ====================

    #[derive(Debug, Default)]
    struct CollectingSink {
        kinds: Mutex<Vec<&'static str>>,
    }

    #[async_trait::async_trait]
    impl PersistenceSink for CollectingSink {
        async fn persist(&self, record: &PersistRecord) -> handoff_sentinel::Result<()> {
            self.kinds.lock().push(record.kind());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_alert_transitions_are_persisted() {
        let sink = Arc::new(CollectingSink::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (writer, handle) = PersistenceWriter::spawn(sink.clone(), 64, shutdown_rx);

        let engine = AlertEngine::new(&escalating_config())
            .unwrap()
            .with_persistence(writer);
        engine
            .add_rule(
                AlertRule::new(
                    "high_error_rate",
                    AlertSeverity::Critical,
                    AlertCondition::ErrorRateAbove { threshold: 0.05 },
                )
                .with_channels(["ops"]),
            )
            .unwrap();

        let start = base_time();
        engine.evaluate(&summary(0.3, start));
        engine.run_escalation_sweep(start + Duration::minutes(5));
        engine.evaluate(&summary(0.0, start + Duration::minutes(6)));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let kinds = sink.kinds.lock().clone();
        assert_eq!(
            kinds,
            vec!["alert", "escalation", "escalation", "alert"],
            "trigger, ladder start, level 2, resolution"
        );
    }
}
