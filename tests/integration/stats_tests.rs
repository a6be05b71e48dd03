//! Rolling stats store integration tests

#[cfg(test)]
mod tests {
    use crate::assert_approx_eq;
    use crate::common::{SampleFactory, base_time};
    use chrono::Duration;
    use handoff_sentinel::config::StatsConfig;
    use handoff_sentinel::monitoring::RollingStatsStore;
    use handoff_sentinel::monitoring::stats::{WindowSpec, instrument};
    use std::sync::Arc;

    // ==================== Concurrent Recording ====================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_recording_loses_nothing() {
        let store = Arc::new(RollingStatsStore::from_config(&StatsConfig::default()));
        let now = base_time();

        let mut handles = Vec::new();
        for worker in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..250 {
                    let agent = if i % 2 == 0 { "billing" } else { "support" };
                    let sample = if worker == 0 && i < 50 {
                        SampleFactory::failed(agent, "llm.generate", i as f64, now)
                    } else {
                        SampleFactory::ok(agent, "llm.generate", i as f64, now)
                    };
                    store.record(sample);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let billing = store.counts_at("billing", "llm.generate", "1h", now);
        let support = store.counts_at("support", "llm.generate", "1h", now);
        assert_eq!(billing.total + support.total, 2000);
        assert_eq!(billing.failures + support.failures, 50);

        let overall = store.window_counts_at("1h", now);
        assert_eq!(overall.total, 2000);
        assert_approx_eq!(overall.error_rate(), 0.025);
    }

    // ==================== Window Boundaries ====================

    #[test]
    fn test_each_window_keeps_its_own_horizon() {
        let store = RollingStatsStore::from_config(&StatsConfig::default());
        let now = base_time();

        store.record(SampleFactory::ok("sales", "crm.lookup", 10.0, now - Duration::minutes(30)));
        store.record(SampleFactory::ok("sales", "crm.lookup", 20.0, now - Duration::hours(5)));
        store.record(SampleFactory::ok("sales", "crm.lookup", 30.0, now - Duration::days(3)));
        store.record(SampleFactory::ok("sales", "crm.lookup", 40.0, now - Duration::days(8)));

        assert_eq!(store.counts_at("sales", "crm.lookup", "1h", now).total, 1);
        assert_eq!(store.counts_at("sales", "crm.lookup", "24h", now).total, 2);
        assert_eq!(store.counts_at("sales", "crm.lookup", "7d", now).total, 3);

        let week = store.percentiles_at("sales", "crm.lookup", "7d", now);
        assert_eq!(week.count, 3);
        assert_approx_eq!(week.p50, 20.0);
        assert_approx_eq!(week.max, 30.0);
    }

    #[test]
    fn test_capacity_keeps_newest_samples() {
        let store = RollingStatsStore::new(vec![WindowSpec::new(
            "short",
            std::time::Duration::from_secs(3600),
            5,
        )]);
        let now = base_time();

        for sample in SampleFactory::ramp("faq", "kb.search", 10, now) {
            store.record(sample);
        }

        let summary = store.percentiles_at("faq", "kb.search", "short", now);
        assert_eq!(summary.count, 5);
        assert_approx_eq!(summary.min, 6.0);
        assert_approx_eq!(summary.max, 10.0);
    }

    #[test]
    fn test_rates_are_zero_without_data() {
        let store = RollingStatsStore::default();
        let now = base_time();

        assert_eq!(store.window_counts_at("1h", now).total, 0);
        assert_eq!(store.window_counts_at("1h", now).error_rate(), 0.0);
        assert_eq!(store.window_counts_at("1h", now).cache_hit_rate(), 0.0);
        assert!(store.snapshot_at("1h", now).is_empty());
    }

    #[test]
    fn test_snapshot_is_sorted_and_skips_idle_keys() {
        let store = RollingStatsStore::default();
        let now = base_time();

        store.record(SampleFactory::cached("support", "kb.search", 5.0, now));
        store.record(SampleFactory::ok("billing", "invoice.fetch", 50.0, now));
        store.record(SampleFactory::ok("archive", "old.op", 50.0, now - Duration::hours(2)));

        let snapshot = store.snapshot_at("1h", now);
        let keys: Vec<_> = snapshot
            .iter()
            .map(|(key, _)| (key.agent_id.as_str(), key.operation.as_str()))
            .collect();
        assert_eq!(keys, vec![("billing", "invoice.fetch"), ("support", "kb.search")]);
        assert_eq!(snapshot[1].1.counts.cache_hits, 1);

        assert_eq!(store.compact_at(now + Duration::days(8)), 3);
        assert!(store.keys().is_empty());
        assert!(store.agents().is_empty());
    }

    // ==================== Instrumentation ====================

    #[tokio::test]
    async fn test_instrument_records_both_outcomes() {
        let store = Arc::new(RollingStatsStore::default());

        let ok: Result<u32, String> = instrument(&store, "router", "intent.classify", || async {
            Ok(7)
        })
        .await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u32, String> = instrument(&store, "router", "intent.classify", || async {
            Err("model unavailable".to_string())
        })
        .await;
        assert!(err.is_err());

        let counts = store.counts("router", "intent.classify", "1h");
        assert_eq!(counts.total, 2);
        assert_eq!(counts.failures, 1);
        assert!(store.last_seen("router").is_some());
    }
}
