//! Handoff coordinator integration tests

#[cfg(test)]
mod tests {
    use crate::common::base_time;
    use chrono::Duration;
    use handoff_sentinel::SentinelError;
    use handoff_sentinel::config::HandoffConfig;
    use handoff_sentinel::monitoring::handoff::{
        BlockReason, HANDOFF_OPERATION, HandoffCoordinator, HandoffOutcome, HandoffRequest,
    };
    use handoff_sentinel::monitoring::RollingStatsStore;
    use std::sync::Arc;

    fn coordinator_with_stats() -> (HandoffCoordinator, Arc<RollingStatsStore>) {
        let stats = Arc::new(RollingStatsStore::default());
        let coordinator =
            HandoffCoordinator::new(HandoffConfig::default()).with_stats(Arc::clone(&stats));
        (coordinator, stats)
    }

    // ==================== Lifecycle ====================

    #[tokio::test]
    async fn test_allowed_handoff_is_executed_and_counted() {
        let (coordinator, stats) = coordinator_with_stats();
        let now = base_time();

        let decision = coordinator
            .request_handoff(HandoffRequest::new("conv-1", "greeter", "billing", 0.92).at(now))
            .await;
        assert!(decision.allowed);
        assert!(decision.reason.is_none());

        let record = coordinator
            .complete_handoff_at("conv-1", &decision.handoff_id, true, now + Duration::seconds(2))
            .await
            .unwrap();
        assert_eq!(record.outcome, HandoffOutcome::Executed);

        let counts = coordinator.outcome_counts(now - Duration::hours(1));
        assert_eq!(counts.attempts, 1);
        assert_eq!(counts.allowed, 1);
        assert_eq!(counts.executed, 1);
        assert_eq!(counts.success_rate(), 1.0);

        // Decision latency lands in the source agent's stats
        let handoff_counts = stats.counts_at("greeter", HANDOFF_OPERATION, "1h", now);
        assert_eq!(handoff_counts.total, 1);
        assert_eq!(handoff_counts.failures, 0);
    }

    #[tokio::test]
    async fn test_completion_errors() {
        let (coordinator, _) = coordinator_with_stats();
        let now = base_time();

        assert!(matches!(
            coordinator.complete_handoff_at("missing", "h-1", true, now).await,
            Err(SentinelError::NotFound(_))
        ));

        let decision = coordinator
            .request_handoff(HandoffRequest::new("conv-2", "greeter", "billing", 0.9).at(now))
            .await;
        assert!(matches!(
            coordinator.complete_handoff_at("conv-2", "unknown-id", true, now).await,
            Err(SentinelError::NotFound(_))
        ));

        coordinator
            .complete_handoff_at("conv-2", &decision.handoff_id, false, now)
            .await
            .unwrap();
        assert!(matches!(
            coordinator
                .complete_handoff_at("conv-2", &decision.handoff_id, true, now)
                .await,
            Err(SentinelError::Conflict(_))
        ));

        let counts = coordinator.outcome_counts(now - Duration::hours(1));
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.success_rate(), 0.0);
    }

    // ==================== Policy ====================

    #[tokio::test]
    async fn test_ping_pong_is_blocked_then_allowed_after_window() {
        let (coordinator, _) = coordinator_with_stats();
        let now = base_time();

        let first = coordinator
            .request_handoff(HandoffRequest::new("conv-3", "sales", "support", 0.9).at(now))
            .await;
        assert!(first.allowed);

        let back = coordinator
            .request_handoff(
                HandoffRequest::new("conv-3", "support", "sales", 0.9)
                    .at(now + Duration::minutes(5)),
            )
            .await;
        assert!(back.is_blocked_for(BlockReason::Circular));

        let later = coordinator
            .request_handoff(
                HandoffRequest::new("conv-3", "support", "sales", 0.9)
                    .at(now + Duration::minutes(31)),
            )
            .await;
        assert!(later.allowed);

        let history = coordinator.history("conv-3").await;
        assert_eq!(history.len(), 3);
        assert!(matches!(
            history[1].outcome,
            HandoffOutcome::Blocked(BlockReason::Circular)
        ));
    }

    #[tokio::test]
    async fn test_checks_apply_in_order() {
        let (coordinator, _) = coordinator_with_stats();
        let now = base_time();

        // Self-handoff wins over low confidence
        let decision = coordinator
            .request_handoff(HandoffRequest::new("conv-4", "faq", "faq", 0.1).at(now))
            .await;
        assert!(decision.is_blocked_for(BlockReason::SelfHandoff));

        let decision = coordinator
            .request_handoff(HandoffRequest::new("conv-4", "faq", "billing", 0.69).at(now))
            .await;
        assert!(decision.is_blocked_for(BlockReason::LowConfidence));
    }

    // ==================== Concurrency ====================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limits_hold_per_conversation_under_contention() {
        let (coordinator, _) = coordinator_with_stats();
        let coordinator = Arc::new(coordinator);
        let now = base_time();

        let mut handles = Vec::new();
        for conversation in 0..10 {
            for attempt in 0..6 {
                let coordinator = Arc::clone(&coordinator);
                handles.push(tokio::spawn(async move {
                    let target = format!("specialist-{}", attempt);
                    let request = HandoffRequest::new(
                        format!("conv-{}", conversation),
                        "triage",
                        target,
                        0.9,
                    )
                    .at(now);
                    coordinator.request_handoff(request).await
                }));
            }
        }

        let mut decisions = Vec::new();
        for handle in handles {
            decisions.push(handle.await.unwrap());
        }

        for conversation in 0..10 {
            let id = format!("conv-{}", conversation);
            let allowed = decisions
                .iter()
                .filter(|d| d.conversation_id == id && d.allowed)
                .count();
            let limited = decisions
                .iter()
                .filter(|d| d.conversation_id == id)
                .filter(|d| d.is_blocked_for(BlockReason::RateLimitHourly))
                .count();
            assert_eq!(allowed, 3, "conversation {}", id);
            assert_eq!(limited, 3, "conversation {}", id);
        }
        assert_eq!(coordinator.conversation_count(), 10);

        let counts = coordinator.outcome_counts(now - Duration::hours(1));
        assert_eq!(counts.attempts, 60);
        assert_eq!(counts.allowed, 30);
        assert_eq!(counts.rate_limited(), 30);
    }

    #[tokio::test]
    async fn test_prune_forgets_old_conversations() {
        let (coordinator, _) = coordinator_with_stats();
        let now = base_time();

        coordinator
            .request_handoff(HandoffRequest::new("conv-old", "a", "b", 0.9).at(now))
            .await;
        coordinator
            .request_handoff(
                HandoffRequest::new("conv-new", "a", "b", 0.9).at(now + Duration::hours(23)),
            )
            .await;

        // One event-log entry and one history record
        let removed = coordinator.prune(now + Duration::hours(25));
        assert_eq!(removed, 2);
        assert_eq!(coordinator.conversation_count(), 1);
        assert!(coordinator.history("conv-old").await.is_empty());
        assert_eq!(coordinator.history("conv-new").await.len(), 1);
    }
}
