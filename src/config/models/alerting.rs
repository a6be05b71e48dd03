//! Alerting configuration

use super::*;
use crate::monitoring::alerts::AlertRule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Alert engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Enable rule evaluation and dispatch
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often the system summary is fed to the engine, in seconds
    #[serde(default = "default_evaluation_interval_seconds")]
    pub evaluation_interval_seconds: u64,
    /// Window the evaluated summary is computed over
    #[serde(default = "default_evaluation_window")]
    pub evaluation_window: String,
    /// How often queued notifications are dispatched, in seconds
    #[serde(default = "default_dispatch_interval_seconds")]
    pub dispatch_interval_seconds: u64,
    /// Closed alerts retained for `get_history`
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Install the built-in rule set before `rules`
    #[serde(default = "default_true")]
    pub use_default_rules: bool,
    /// Channels the built-in rules notify
    #[serde(default = "default_rule_channels")]
    pub default_rule_channels: Vec<String>,
    /// P95 targets per operation, in milliseconds
    #[serde(default)]
    pub sla_targets: BTreeMap<String, f64>,
    /// P95 target for operations without an entry in `sla_targets`
    #[serde(default = "default_sla_target_ms")]
    pub default_sla_target_ms: f64,
    /// Additional or overriding rules
    #[serde(default)]
    pub rules: Vec<AlertRule>,
    /// Notification channels
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// Escalation ladder for critical alerts
    #[serde(default)]
    pub escalation: EscalationConfig,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            evaluation_interval_seconds: default_evaluation_interval_seconds(),
            evaluation_window: default_evaluation_window(),
            dispatch_interval_seconds: default_dispatch_interval_seconds(),
            history_limit: default_history_limit(),
            use_default_rules: true,
            default_rule_channels: default_rule_channels(),
            sla_targets: BTreeMap::new(),
            default_sla_target_ms: default_sla_target_ms(),
            rules: Vec::new(),
            channels: Vec::new(),
            escalation: EscalationConfig::default(),
        }
    }
}

impl AlertingConfig {
    /// Evaluation interval as a duration
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_seconds)
    }

    /// Dispatch drain interval as a duration
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_seconds)
    }

    /// P95 target for an operation
    pub fn sla_target_for(&self, operation: &str) -> f64 {
        self.sla_targets
            .get(operation)
            .copied()
            .unwrap_or(self.default_sla_target_ms)
    }
}

fn default_rule_channels() -> Vec<String> {
    vec!["primary".to_string()]
}

/// Notification channel definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    /// Templated email handed to an HTTP mail relay
    Email {
        id: String,
        relay_url: String,
        #[serde(default)]
        api_key: Option<String>,
        from: String,
        to: Vec<String>,
        #[serde(default)]
        subject_template: Option<String>,
        #[serde(default)]
        body_template: Option<String>,
    },
    /// Chat webhook (Slack-compatible attachment payload)
    ChatWebhook {
        id: String,
        webhook_url: String,
        #[serde(default)]
        channel: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },
    /// Generic HTTP webhook with arbitrary headers and a JSON body
    Webhook {
        id: String,
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Incident-management platform
    Incident {
        id: String,
        url: String,
        api: IncidentApiConfig,
    },
}

impl ChannelConfig {
    /// Channel identifier referenced by rules and escalation levels
    pub fn id(&self) -> &str {
        match self {
            ChannelConfig::Email { id, .. }
            | ChannelConfig::ChatWebhook { id, .. }
            | ChannelConfig::Webhook { id, .. }
            | ChannelConfig::Incident { id, .. } => id,
        }
    }

    /// Endpoint the channel posts to
    pub fn endpoint(&self) -> &str {
        match self {
            ChannelConfig::Email { relay_url, .. } => relay_url,
            ChannelConfig::ChatWebhook { webhook_url, .. } => webhook_url,
            ChannelConfig::Webhook { url, .. } | ChannelConfig::Incident { url, .. } => url,
        }
    }
}

/// The two supported incident platform API shapes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncidentApiConfig {
    /// Events API keyed by an integration routing key
    Events { routing_key: String },
    /// Alerts API authenticated with a static API key
    Alerts { api_key: String },
}

/// Escalation ladder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Run the escalation sweep
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Sweep interval in seconds
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    /// Seconds after the trigger before level 2
    #[serde(default = "default_level2_delay_seconds")]
    pub level2_delay_seconds: u64,
    /// Seconds after the trigger before level 3
    #[serde(default = "default_level3_delay_seconds")]
    pub level3_delay_seconds: u64,
    /// Channel superset notified at level 2
    #[serde(default)]
    pub level2_channels: Vec<String>,
    /// Incident channels notified at level 3
    #[serde(default)]
    pub level3_channels: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_seconds: default_sweep_interval_seconds(),
            level2_delay_seconds: default_level2_delay_seconds(),
            level3_delay_seconds: default_level3_delay_seconds(),
            level2_channels: Vec::new(),
            level3_channels: Vec::new(),
        }
    }
}

impl EscalationConfig {
    /// Sweep interval as a duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}
