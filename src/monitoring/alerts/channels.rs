//! Notification channel implementations

use super::types::{Alert, AlertSeverity};
use crate::config::{ChannelConfig, IncidentApiConfig};
use crate::utils::error::{Result, SentinelError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Notification channel trait
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync + std::fmt::Debug {
    /// Send a notification
    async fn send(&self, alert: &Alert) -> Result<()>;

    /// Channel id referenced by rules
    fn id(&self) -> &str;

    /// Channel type name
    fn kind(&self) -> &'static str;

    /// Check if channel supports severity level
    fn supports_severity(&self, _severity: AlertSeverity) -> bool {
        true
    }
}

/// Build a channel from its configuration
pub fn build_channel(
    config: &ChannelConfig,
    client: reqwest::Client,
) -> Result<Arc<dyn NotificationChannel>> {
    url::Url::parse(config.endpoint()).map_err(|e| {
        SentinelError::Config(format!("Invalid endpoint for channel {}: {}", config.id(), e))
    })?;

    let channel: Arc<dyn NotificationChannel> = match config {
        ChannelConfig::Email {
            id,
            relay_url,
            api_key,
            from,
            to,
            subject_template,
            body_template,
        } => {
            let transport = HttpRelayTransport::new(relay_url.clone(), api_key.clone(), client);
            let mut channel =
                EmailChannel::new(id.clone(), from.clone(), to.clone(), Arc::new(transport));
            if let Some(template) = subject_template {
                channel = channel.with_subject_template(template.clone());
            }
            if let Some(template) = body_template {
                channel = channel.with_body_template(template.clone());
            }
            Arc::new(channel)
        }
        ChannelConfig::ChatWebhook {
            id,
            webhook_url,
            channel,
            username,
        } => Arc::new(ChatWebhookChannel::new(
            id.clone(),
            webhook_url.clone(),
            channel.clone(),
            username.clone(),
            client,
        )),
        ChannelConfig::Webhook { id, url, headers } => Arc::new(WebhookChannel::new(
            id.clone(),
            url.clone(),
            headers.clone(),
            client,
        )),
        ChannelConfig::Incident { id, url, api } => Arc::new(IncidentChannel::new(
            id.clone(),
            url.clone(),
            api.clone(),
            client,
        )),
    };
    debug!("Built {} channel {}", channel.kind(), channel.id());
    Ok(channel)
}

async fn check_status(kind: &str, response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(SentinelError::notification(format!(
        "{} endpoint returned status {}: {}",
        kind,
        status,
        body.chars().take(200).collect::<String>()
    )))
}

fn short_summary(alert: &Alert) -> String {
    format!("[{}] {}: {}", alert.severity, alert.rule_name, alert.message)
}

/// Chat webhook channel posting an attachment payload
#[derive(Debug)]
pub struct ChatWebhookChannel {
    id: String,
    webhook_url: String,
    channel: Option<String>,
    username: Option<String>,
    client: reqwest::Client,
}

impl ChatWebhookChannel {
    pub fn new(
        id: String,
        webhook_url: String,
        channel: Option<String>,
        username: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            id,
            webhook_url,
            channel,
            username,
            client,
        }
    }

    fn payload(&self, alert: &Alert) -> serde_json::Value {
        let color = match alert.severity {
            AlertSeverity::Warning => "#ff9500",
            AlertSeverity::Critical => "#ff0000",
        };

        serde_json::json!({
            "username": self.username.as_deref().unwrap_or("Handoff Sentinel"),
            "channel": self.channel,
            "text": short_summary(alert),
            "attachments": [{
                "color": color,
                "title": alert.rule_name,
                "text": alert.message,
                "fields": [
                    {
                        "title": "Severity",
                        "value": alert.severity.to_string(),
                        "short": true
                    },
                    {
                        "title": "Escalation level",
                        "value": alert.escalation_level,
                        "short": true
                    },
                    {
                        "title": "Triggered",
                        "value": alert.triggered_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                        "short": true
                    }
                ],
                "footer": "Handoff Sentinel",
                "ts": alert.triggered_at.timestamp()
            }]
        })
    }
}

#[async_trait::async_trait]
impl NotificationChannel for ChatWebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.payload(alert))
            .send()
            .await
            .map_err(|e| {
                SentinelError::notification(format!("Failed to send chat notification: {}", e))
            })?;
        check_status("Chat webhook", response).await
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "chat_webhook"
    }
}

/// Generic HTTP webhook posting the alert as JSON
#[derive(Debug)]
pub struct WebhookChannel {
    id: String,
    url: String,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(
        id: String,
        url: String,
        headers: HashMap<String, String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            id,
            url,
            headers,
            client,
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let mut request = self.client.post(&self.url).json(&serde_json::json!({
            "event": "alert",
            "alert": alert,
        }));
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            SentinelError::notification(format!("Failed to send webhook notification: {}", e))
        })?;
        check_status("Webhook", response).await
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "webhook"
    }
}

/// Incident-management platform channel
#[derive(Debug)]
pub struct IncidentChannel {
    id: String,
    url: String,
    api: IncidentApiConfig,
    client: reqwest::Client,
}

impl IncidentChannel {
    pub fn new(id: String, url: String, api: IncidentApiConfig, client: reqwest::Client) -> Self {
        Self {
            id,
            url,
            api,
            client,
        }
    }

    fn request(&self, alert: &Alert) -> reqwest::RequestBuilder {
        match &self.api {
            IncidentApiConfig::Events { routing_key } => {
                let severity = match alert.severity {
                    AlertSeverity::Warning => "warning",
                    AlertSeverity::Critical => "critical",
                };
                self.client.post(&self.url).json(&serde_json::json!({
                    "routing_key": routing_key,
                    "event_action": "trigger",
                    "dedup_key": format!("{}:{}", alert.rule_name, alert.id),
                    "payload": {
                        "summary": short_summary(alert),
                        "severity": severity,
                        "source": "handoff-sentinel",
                        "timestamp": alert.triggered_at.to_rfc3339(),
                        "custom_details": {
                            "value": alert.value,
                            "threshold": alert.threshold,
                            "subject": alert.subject,
                            "escalation_level": alert.escalation_level,
                        }
                    }
                }))
            }
            IncidentApiConfig::Alerts { api_key } => {
                let priority = match alert.severity {
                    AlertSeverity::Warning => "P3",
                    AlertSeverity::Critical => "P1",
                };
                self.client
                    .post(&self.url)
                    .header("Authorization", format!("GenieKey {}", api_key))
                    .json(&serde_json::json!({
                        "message": short_summary(alert),
                        "alias": format!("{}:{}", alert.rule_name, alert.id),
                        "description": alert.message,
                        "priority": priority,
                        "source": "handoff-sentinel",
                        "details": {
                            "value": alert.value.to_string(),
                            "threshold": alert.threshold.to_string(),
                            "escalation_level": alert.escalation_level.to_string(),
                        }
                    }))
            }
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for IncidentChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let response = self.request(alert).send().await.map_err(|e| {
            SentinelError::notification(format!("Failed to open incident: {}", e))
        })?;
        check_status("Incident", response).await
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "incident"
    }
}

/// A rendered email
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail delivery capability used by [`EmailChannel`]
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync + std::fmt::Debug {
    async fn deliver(&self, message: &EmailMessage) -> Result<()>;
}

/// Hands messages to an HTTP mail relay as JSON
#[derive(Debug)]
pub struct HttpRelayTransport {
    relay_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpRelayTransport {
    pub fn new(relay_url: String, api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            relay_url,
            api_key,
            client,
        }
    }
}

#[async_trait::async_trait]
impl MailTransport for HttpRelayTransport {
    async fn deliver(&self, message: &EmailMessage) -> Result<()> {
        let mut request = self.client.post(&self.relay_url).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| {
            SentinelError::notification(format!("Failed to reach mail relay: {}", e))
        })?;
        check_status("Mail relay", response).await
    }
}

const DEFAULT_SUBJECT_TEMPLATE: &str = "[{severity}] {rule} triggered";
const DEFAULT_BODY_TEMPLATE: &str = "Rule: {rule}\nSeverity: {severity}\nTriggered: {triggered_at}\nEscalation level: {level}\n\n{message}\n\nValue: {value} (threshold {threshold})";

/// Email notification channel with templated subject and body
#[derive(Debug)]
pub struct EmailChannel {
    id: String,
    from: String,
    recipients: Vec<String>,
    subject_template: String,
    body_template: String,
    transport: Arc<dyn MailTransport>,
}

impl EmailChannel {
    /// Create a new email notification channel
    pub fn new(
        id: String,
        from: String,
        recipients: Vec<String>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            id,
            from,
            recipients,
            subject_template: DEFAULT_SUBJECT_TEMPLATE.to_string(),
            body_template: DEFAULT_BODY_TEMPLATE.to_string(),
            transport,
        }
    }

    pub fn with_subject_template(mut self, template: String) -> Self {
        self.subject_template = template;
        self
    }

    pub fn with_body_template(mut self, template: String) -> Self {
        self.body_template = template;
        self
    }

    /// Render the message for an alert
    pub fn render(&self, alert: &Alert) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: self.recipients.clone(),
            subject: render_template(&self.subject_template, alert),
            body: render_template(&self.body_template, alert),
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        if self.recipients.is_empty() {
            return Err(SentinelError::notification(format!(
                "Email channel {} has no recipients",
                self.id
            )));
        }
        self.transport.deliver(&self.render(alert)).await
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "email"
    }
}

/// Substitute `{placeholder}`s with alert fields; unknown placeholders are kept
fn render_template(template: &str, alert: &Alert) -> String {
    let replacements = [
        ("{rule}", alert.rule_name.clone()),
        ("{severity}", alert.severity.to_string()),
        ("{message}", alert.message.clone()),
        ("{value}", format!("{:.3}", alert.value)),
        ("{threshold}", format!("{:.3}", alert.threshold)),
        ("{subject}", alert.subject.clone().unwrap_or_default()),
        ("{level}", alert.escalation_level.to_string()),
        (
            "{triggered_at}",
            alert.triggered_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
        ("{alert_id}", alert.id.clone()),
    ];

    replacements
        .iter()
        .fold(template.to_string(), |text, (placeholder, value)| {
            text.replace(placeholder, value)
        })
}
