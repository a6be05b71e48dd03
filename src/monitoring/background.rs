//! Background loops for HandoffSentinel

use super::system::HandoffSentinel;
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

impl HandoffSentinel {
    /// Spawn the evaluation, dispatch, escalation and maintenance loops
    pub(super) fn start_background_tasks(&self) {
        let mut handles = Vec::new();
        let alerting = self.config.alerting();

        if alerting.enabled {
            let sentinel = self.clone();
            handles.push(spawn_loop(
                "evaluation",
                alerting.evaluation_interval(),
                self.shutdown.subscribe(),
                move || {
                    let sentinel = sentinel.clone();
                    async move {
                        let window = &sentinel.config.alerting().evaluation_window;
                        if let Err(e) = sentinel.metrics.feed_alerting(&sentinel.alerts, window) {
                            warn!("Failed to evaluate alert rules: {}", e);
                        }
                    }
                },
            ));

            let sentinel = self.clone();
            handles.push(spawn_loop(
                "dispatch",
                alerting.dispatch_interval(),
                self.shutdown.subscribe(),
                move || {
                    let sentinel = sentinel.clone();
                    async move {
                        if let Err(e) = sentinel.alerts.process_pending().await {
                            warn!("Failed to process pending alerts: {}", e);
                        }
                    }
                },
            ));
        }

        if alerting.escalation.enabled {
            let sentinel = self.clone();
            handles.push(spawn_loop(
                "escalation",
                alerting.escalation.sweep_interval(),
                self.shutdown.subscribe(),
                move || {
                    let sentinel = sentinel.clone();
                    async move {
                        let advanced = sentinel.alerts.run_escalation_sweep(Utc::now());
                        if !advanced.is_empty() {
                            debug!("Escalation sweep advanced {} alerts", advanced.len());
                        }
                    }
                },
            ));
        }

        let sentinel = self.clone();
        handles.push(spawn_loop(
            "maintenance",
            MAINTENANCE_INTERVAL,
            self.shutdown.subscribe(),
            move || {
                let sentinel = sentinel.clone();
                async move { sentinel.maintain(Utc::now()) }
            },
        ));

        self.tasks.lock().extend(handles);
    }
}

/// Run `task` every `period` until shutdown is signalled.
///
/// A pass that has started always runs to completion before the loop observes shutdown.
fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut task: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(10)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => task().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("{} loop stopped", name);
    })
}
