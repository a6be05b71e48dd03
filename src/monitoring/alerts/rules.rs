//! Built-in rule set

use super::conditions::AlertCondition;
use super::types::{AlertRule, AlertSeverity};

/// Default rules, all notifying `channels`
pub fn default_rules(channels: &[String]) -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            "sla_breach",
            AlertSeverity::Warning,
            AlertCondition::SlaBreach {
                operation: None,
                target_ms: None,
            },
        )
        .with_description("P95 latency above the operation's SLA target")
        .with_min_samples(10),
        AlertRule::new(
            "high_error_rate",
            AlertSeverity::Critical,
            AlertCondition::ErrorRateAbove { threshold: 0.05 },
        )
        .with_description("More than 5% of operations failing")
        .with_min_samples(20),
        AlertRule::new(
            "low_cache_hit_rate",
            AlertSeverity::Warning,
            AlertCondition::CacheHitRateBelow { threshold: 0.5 },
        )
        .with_description("Fewer than half of operations served from cache")
        .with_min_samples(20),
        AlertRule::new(
            "handoff_failure_rate",
            AlertSeverity::Critical,
            AlertCondition::HandoffSuccessBelow { threshold: 0.95 },
        )
        .with_description("Handoff success rate below 95%")
        .with_min_samples(5),
        AlertRule::new(
            "agent_silence",
            AlertSeverity::Critical,
            AlertCondition::AgentSilence {
                silence_seconds: 5 * 60,
            },
        )
        .with_description("An agent recorded no samples for 5 minutes"),
        AlertRule::new(
            "circular_handoff_spike",
            AlertSeverity::Warning,
            AlertCondition::CircularHandoffSpike { threshold: 10 },
        )
        .with_description("More than 10 handoffs blocked as circular"),
        AlertRule::new(
            "rate_limit_spike",
            AlertSeverity::Warning,
            AlertCondition::RateLimitSpike { threshold: 0.10 },
        )
        .with_description("More than 10% of handoff attempts rate limited")
        .with_min_samples(10),
    ]
    .into_iter()
    .map(|rule| rule.with_channels(channels.iter().cloned()))
    .collect()
}
