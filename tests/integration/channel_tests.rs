//! Notification channel integration tests against mock HTTP endpoints

#[cfg(test)]
mod tests {
    use crate::common::{base_time, quiet_alerting_config};
    use handoff_sentinel::SentinelError;
    use handoff_sentinel::config::{ChannelConfig, IncidentApiConfig};
    use handoff_sentinel::monitoring::alerts::{
        Alert, AlertCondition, AlertEngine, AlertRule, AlertSeverity, AlertStatus, build_channel,
    };
    use handoff_sentinel::monitoring::metrics::{HandoffSummary, Summary, SystemSummary};
    use std::collections::{BTreeMap, HashMap};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn critical_alert() -> Alert {
        let at = base_time();
        Alert {
            id: "a-1".to_string(),
            rule_name: "high_error_rate".to_string(),
            severity: AlertSeverity::Critical,
            status: AlertStatus::Active,
            message: "Error rate 30.0% above 5.0%".to_string(),
            value: 0.3,
            threshold: 0.05,
            subject: None,
            channels: vec!["ops".to_string()],
            triggered_at: at,
            last_dispatched_at: at,
            notifications: 1,
            escalation_level: 1,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_at: None,
        }
    }

    // ==================== Channel Payloads ====================

    #[tokio::test]
    async fn test_chat_webhook_posts_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/ops"))
            .and(body_partial_json(serde_json::json!({
                "username": "sentinel",
                "channel": "#alerts",
                "attachments": [{ "color": "#ff0000", "title": "high_error_rate" }]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = build_channel(
            &ChannelConfig::ChatWebhook {
                id: "ops".to_string(),
                webhook_url: format!("{}/hooks/ops", server.uri()),
                channel: Some("#alerts".to_string()),
                username: Some("sentinel".to_string()),
            },
            reqwest::Client::new(),
        )
        .unwrap();

        assert_eq!(channel.kind(), "chat_webhook");
        channel.send(&critical_alert()).await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_sends_configured_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audit"))
            .and(header("x-token", "s3cret"))
            .and(body_partial_json(serde_json::json!({
                "event": "alert",
                "alert": { "id": "a-1", "severity": "critical" }
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HashMap::new();
        headers.insert("X-Token".to_string(), "s3cret".to_string());
        let channel = build_channel(
            &ChannelConfig::Webhook {
                id: "audit".to_string(),
                url: format!("{}/audit", server.uri()),
                headers,
            },
            reqwest::Client::new(),
        )
        .unwrap();

        channel.send(&critical_alert()).await.unwrap();
    }

    #[tokio::test]
    async fn test_incident_events_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/enqueue"))
            .and(body_partial_json(serde_json::json!({
                "routing_key": "r-123",
                "event_action": "trigger",
                "payload": { "severity": "critical", "source": "handoff-sentinel" }
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let channel = build_channel(
            &ChannelConfig::Incident {
                id: "pager".to_string(),
                url: format!("{}/v2/enqueue", server.uri()),
                api: IncidentApiConfig::Events {
                    routing_key: "r-123".to_string(),
                },
            },
            reqwest::Client::new(),
        )
        .unwrap();

        channel.send(&critical_alert()).await.unwrap();
    }

    #[tokio::test]
    async fn test_incident_alerts_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/alerts"))
            .and(header("authorization", "GenieKey k-456"))
            .and(body_partial_json(serde_json::json!({
                "priority": "P1",
                "alias": "high_error_rate:a-1"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let channel = build_channel(
            &ChannelConfig::Incident {
                id: "genie".to_string(),
                url: format!("{}/v2/alerts", server.uri()),
                api: IncidentApiConfig::Alerts {
                    api_key: "k-456".to_string(),
                },
            },
            reqwest::Client::new(),
        )
        .unwrap();

        channel.send(&critical_alert()).await.unwrap();
    }

    #[tokio::test]
    async fn test_email_relay_receives_rendered_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer relay-key"))
            .and(body_partial_json(serde_json::json!({
                "from": "sentinel@example.com",
                "to": ["oncall@example.com"],
                "subject": "high_error_rate is critical"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = build_channel(
            &ChannelConfig::Email {
                id: "mail".to_string(),
                relay_url: format!("{}/send", server.uri()),
                api_key: Some("relay-key".to_string()),
                from: "sentinel@example.com".to_string(),
                to: vec!["oncall@example.com".to_string()],
                subject_template: Some("{rule} is {severity}".to_string()),
                body_template: None,
            },
            reqwest::Client::new(),
        )
        .unwrap();

        channel.send(&critical_alert()).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_a_notification_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let channel = build_channel(
            &ChannelConfig::Webhook {
                id: "audit".to_string(),
                url: server.uri(),
                headers: HashMap::new(),
            },
            reqwest::Client::new(),
        )
        .unwrap();

        let err = channel.send(&critical_alert()).await.unwrap_err();
        assert!(matches!(err, SentinelError::Notification(_)));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let result = build_channel(
            &ChannelConfig::Webhook {
                id: "audit".to_string(),
                url: "not a url".to_string(),
                headers: HashMap::new(),
            },
            reqwest::Client::new(),
        );
        assert!(matches!(result, Err(SentinelError::Config(_))));
    }

    // ==================== Engine Wiring ====================

    #[tokio::test]
    async fn test_configured_channel_receives_engine_dispatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/primary"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = quiet_alerting_config();
        config.channels.push(ChannelConfig::ChatWebhook {
            id: "primary".to_string(),
            webhook_url: format!("{}/hooks/primary", server.uri()),
            channel: None,
            username: None,
        });
        let engine = AlertEngine::new(&config).unwrap();
        assert_eq!(engine.channel_ids(), vec!["primary"]);

        engine
            .add_rule(
                AlertRule::new(
                    "low_cache_hit_rate",
                    AlertSeverity::Warning,
                    AlertCondition::CacheHitRateBelow { threshold: 0.5 },
                )
                .with_channels(["primary"]),
            )
            .unwrap();

        let summary = SystemSummary {
            window: "1h".to_string(),
            generated_at: base_time(),
            overall: Summary {
                cache_hit_rate: 0.1,
                total_count: 50,
                success_count: 50,
                ..Summary::default()
            },
            agents: BTreeMap::new(),
            operations: BTreeMap::new(),
            handoffs: HandoffSummary::default(),
        };
        assert_eq!(engine.evaluate(&summary).len(), 1);
        assert_eq!(engine.process_pending().await.unwrap(), 1);
        assert_eq!(engine.get_stats().channels["primary"].sent, 1);
    }
}
