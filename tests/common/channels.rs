//! Notification channels for tests

use handoff_sentinel::SentinelError;
use handoff_sentinel::monitoring::alerts::{Alert, NotificationChannel};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every alert it is asked to send
#[derive(Debug)]
pub struct RecordingChannel {
    id: String,
    fail: bool,
    received: Mutex<Vec<Alert>>,
}

impl RecordingChannel {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            fail: false,
            received: Mutex::new(Vec::new()),
        })
    }

    /// A channel whose every send fails after recording the attempt
    pub fn failing(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            fail: true,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.received.lock().len()
    }

    pub fn received(&self) -> Vec<Alert> {
        self.received.lock().clone()
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .map(|a| a.rule_name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, alert: &Alert) -> handoff_sentinel::Result<()> {
        self.received.lock().push(alert.clone());
        if self.fail {
            Err(SentinelError::notification(format!("{} is down", self.id)))
        } else {
            Ok(())
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}
