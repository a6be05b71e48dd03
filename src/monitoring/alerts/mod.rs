//! Alert engine
//!
//! Rules are evaluated against system summaries; triggered alerts are queued and fanned
//! out to notification channels, and unacknowledged critical alerts climb an escalation
//! ladder driven by a periodic sweep.

mod channels;
mod conditions;
mod escalation;
mod manager;
mod processing;
mod rules;
mod types;


pub use channels::{
    build_channel, ChatWebhookChannel, EmailChannel, EmailMessage, HttpRelayTransport,
    IncidentChannel, MailTransport, NotificationChannel, WebhookChannel,
};
pub use conditions::{AlertCondition, ComparisonOperator, ConditionMatch, CustomCondition};
pub use manager::AlertEngine;
pub use rules::default_rules;
pub use types::{
    Alert, AlertEvent, AlertRule, AlertSeverity, AlertStats, AlertStatus, ChannelDeliveryStats,
    EscalationState,
};
