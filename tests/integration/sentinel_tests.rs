//! Assembled sentinel integration tests

#[cfg(test)]
mod tests {
    use crate::common::{RecordingChannel, quiet_config};
    use chrono::Utc;
    use handoff_sentinel::HandoffSentinel;
    use handoff_sentinel::monitoring::alerts::{AlertCondition, AlertRule, AlertSeverity};
    use handoff_sentinel::monitoring::handoff::BlockReason;
    use handoff_sentinel::monitoring::metrics::HealthStatus;
    use tempfile::TempDir;

    async fn sentinel_with_rule() -> (HandoffSentinel, std::sync::Arc<RecordingChannel>) {
        let sentinel = HandoffSentinel::new(quiet_config()).await.unwrap();
        let ops = RecordingChannel::new("ops");
        sentinel.alerts().register_channel(ops.clone());
        sentinel
            .alerts()
            .add_rule(
                AlertRule::new(
                    "high_error_rate",
                    AlertSeverity::Critical,
                    AlertCondition::ErrorRateAbove { threshold: 0.05 },
                )
                .with_channels(["ops"]),
            )
            .unwrap();
        (sentinel, ops)
    }

    // ==================== Event Flow ====================

    #[tokio::test]
    async fn test_interactions_and_handoffs_reach_alerting() {
        let (sentinel, ops) = sentinel_with_rule().await;

        for i in 0..20 {
            sentinel.interaction_completed("billing", "invoice.fetch", 40.0, i % 2 == 0, false);
        }

        let decision = sentinel
            .handoff_proposed("conv-1", "billing", "support", 0.95)
            .await;
        assert!(decision.allowed);
        sentinel
            .handoff_completed("conv-1", &decision.handoff_id, true)
            .await
            .unwrap();

        let blocked = sentinel
            .handoff_proposed("conv-1", "support", "billing", 0.95)
            .await;
        assert!(blocked.is_blocked_for(BlockReason::Circular));

        let summary = sentinel.system_summary().unwrap();
        assert_eq!(summary.agents["billing"].operations["invoice.fetch"].total_count, 20);
        assert_eq!(summary.handoffs.executed, 1);
        assert_eq!(summary.handoffs.blocked_for(BlockReason::Circular), 1);

        let report = sentinel.tick(Utc::now()).await.unwrap();
        assert_eq!(report.alerts_fired, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(ops.count(), 1);

        let active = sentinel.get_active_alerts();
        assert_eq!(active.len(), 1);
        assert_eq!(sentinel.get_escalation_status().len(), 1);

        sentinel.acknowledge(&active[0].id, "operator").unwrap();
        assert!(sentinel.get_active_alerts().is_empty());

        let health = sentinel.health_report().unwrap();
        assert_eq!(health.agent("billing").unwrap().status, HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_timer_records_on_drop() {
        let sentinel = HandoffSentinel::new(quiet_config()).await.unwrap();

        {
            let mut timer = sentinel.start_timer("faq", "kb.search");
            timer.mark_cache_hit();
            timer.succeed();
        }
        {
            let _timer = sentinel.start_timer("faq", "kb.search");
        }

        let counts = sentinel.stats().counts("faq", "kb.search", "1h");
        assert_eq!(counts.total, 2);
        assert_eq!(counts.failures, 1);
        assert_eq!(counts.cache_hits, 1);
    }

    // ==================== Lifecycle ====================

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let sentinel = HandoffSentinel::new(quiet_config()).await.unwrap();
        assert!(!sentinel.is_running());

        sentinel.start().await.unwrap();
        assert!(sentinel.is_running());
        // Second start is a no-op
        sentinel.start().await.unwrap();

        sentinel.interaction_completed("billing", "invoice.fetch", 12.0, true, false);

        tokio::time::timeout(std::time::Duration::from_secs(5), sentinel.shutdown())
            .await
            .expect("shutdown should not hang")
            .unwrap();
        assert!(!sentinel.is_running());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = quiet_config();
        config.sentinel.handoff.confidence_threshold = 1.5;
        assert!(HandoffSentinel::new(config).await.is_err());
    }

    // ==================== Persistence ====================

    #[tokio::test]
    async fn test_state_changes_are_written_as_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events").join("sentinel.jsonl");

        let mut config = quiet_config();
        config.sentinel.persistence.enabled = true;
        config.sentinel.persistence.path = path.to_string_lossy().into_owned();

        let sentinel = HandoffSentinel::new(config).await.unwrap();
        sentinel.interaction_completed("billing", "invoice.fetch", 25.0, true, false);
        let decision = sentinel
            .handoff_proposed("conv-7", "billing", "support", 0.9)
            .await;
        sentinel
            .handoff_completed("conv-7", &decision.handoff_id, true)
            .await
            .unwrap();
        sentinel.shutdown().await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let kinds: Vec<String> = content
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["kind"].as_str().unwrap().to_string()
            })
            .collect();

        // Interaction, decision, decision latency sample, completion
        assert_eq!(kinds, vec!["sample", "handoff", "sample", "handoff"]);
        assert_eq!(sentinel.dropped_persistence_records(), 0);
    }
}
