//! Alerting configuration validators

use super::Validate;
use crate::config::models::*;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

fn validate_endpoint(endpoint: &str, context: &str) -> Result<(), String> {
    let url = Url::parse(endpoint)
        .map_err(|e| format!("{} has invalid URL format: {}", context, e))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!(
            "{} must use http:// or https:// scheme, got: {}",
            context, scheme
        )),
    }
}

impl Validate for AlertingConfig {
    fn validate(&self) -> Result<(), String> {
        debug!("Validating alerting configuration");

        if self.evaluation_interval_seconds == 0 || self.dispatch_interval_seconds == 0 {
            return Err("Alert evaluation and dispatch intervals must be greater than 0".to_string());
        }
        if self.default_sla_target_ms <= 0.0 {
            return Err("Default SLA target must be positive".to_string());
        }
        for (operation, target) in &self.sla_targets {
            if *target <= 0.0 {
                return Err(format!("SLA target for '{}' must be positive", operation));
            }
        }

        let mut channel_ids = HashSet::new();
        for channel in &self.channels {
            channel.validate()?;
            if !channel_ids.insert(channel.id()) {
                return Err(format!("Duplicate channel id: {}", channel.id()));
            }
        }

        let mut rule_names = HashSet::new();
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                return Err("Alert rule name cannot be empty".to_string());
            }
            if !rule_names.insert(rule.name.as_str()) {
                return Err(format!("Duplicate alert rule: {}", rule.name));
            }
            for channel in &rule.channels {
                if !channel_ids.contains(channel.as_str()) {
                    warn!(
                        "Alert rule '{}' references unconfigured channel '{}'",
                        rule.name, channel
                    );
                }
            }
        }

        self.escalation.validate()?;
        Ok(())
    }
}

impl Validate for ChannelConfig {
    fn validate(&self) -> Result<(), String> {
        if self.id().trim().is_empty() {
            return Err("Channel id cannot be empty".to_string());
        }

        let context = format!("Channel '{}'", self.id());
        validate_endpoint(self.endpoint(), &context)?;

        match self {
            ChannelConfig::Email { from, to, .. } => {
                if from.trim().is_empty() {
                    return Err(format!("{} requires a from address", context));
                }
                if to.is_empty() {
                    return Err(format!("{} requires at least one recipient", context));
                }
            }
            ChannelConfig::Incident { api, .. } => match api {
                IncidentApiConfig::Events { routing_key } if routing_key.is_empty() => {
                    return Err(format!("{} requires a routing key", context));
                }
                IncidentApiConfig::Alerts { api_key } if api_key.is_empty() => {
                    return Err(format!("{} requires an API key", context));
                }
                _ => {}
            },
            ChannelConfig::ChatWebhook { .. } | ChannelConfig::Webhook { .. } => {}
        }

        Ok(())
    }
}

impl Validate for EscalationConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.sweep_interval_seconds == 0 {
            return Err("Escalation sweep interval must be greater than 0".to_string());
        }
        if self.level3_delay_seconds <= self.level2_delay_seconds {
            return Err("Escalation level 3 delay must be longer than level 2 delay".to_string());
        }
        Ok(())
    }
}
