//! Core HandoffSentinel implementation

use super::alerts::{Alert, AlertEngine, EscalationState};
use super::handoff::{HandoffCoordinator, HandoffDecision, HandoffRecord, HandoffRequest};
use super::metrics::{HealthReport, MetricsAggregator, SystemSummary};
use super::persistence::{JsonlFileSink, PersistenceWriter};
use super::stats::{OperationTimer, RollingStatsStore, Sample};
use super::tracer::recorder_from_config;
use crate::config::Config;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Alerts created or renewed by evaluation
    pub alerts_fired: usize,
    /// Ladders advanced by the escalation sweep
    pub escalated: usize,
    /// Notifications successfully delivered
    pub delivered: usize,
}

/// The four components wired together, plus their background loops
#[derive(Debug, Clone)]
pub struct HandoffSentinel {
    pub(super) config: Arc<Config>,
    pub(super) stats: Arc<RollingStatsStore>,
    pub(super) handoffs: Arc<HandoffCoordinator>,
    pub(super) metrics: Arc<MetricsAggregator>,
    pub(super) alerts: Arc<AlertEngine>,
    pub(super) persistence: PersistenceWriter,
    pub(super) shutdown: Arc<watch::Sender<bool>>,
    pub(super) tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    pub(super) running: Arc<AtomicBool>,
    pub(super) start_time: Instant,
}

impl HandoffSentinel {
    /// Build every component from configuration
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing handoff sentinel");
        config.validate()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        let persistence = if config.persistence().enabled {
            let sink = Arc::new(JsonlFileSink::new(&config.persistence().path));
            let (writer, handle) =
                PersistenceWriter::spawn(sink, config.persistence().buffer_size, shutdown_rx);
            tasks.push(handle);
            info!("Persisting records to {}", config.persistence().path);
            writer
        } else {
            PersistenceWriter::disabled()
        };

        let recorder = recorder_from_config(&config.sentinel.tracing);
        debug!("Span recorder: {}", recorder.name());

        let stats = Arc::new(
            RollingStatsStore::from_config(config.stats())
                .with_persistence(persistence.clone())
                .with_span_recorder(recorder),
        );
        let handoffs = Arc::new(
            HandoffCoordinator::new(config.handoff().clone())
                .with_stats(Arc::clone(&stats))
                .with_persistence(persistence.clone()),
        );
        let metrics = Arc::new(
            MetricsAggregator::new(Arc::clone(&stats), Arc::clone(&handoffs))
                .with_sla_targets(config.alerting()),
        );
        let alerts =
            Arc::new(AlertEngine::new(config.alerting())?.with_persistence(persistence.clone()));

        info!("Handoff sentinel initialized");

        Ok(Self {
            config: Arc::new(config),
            stats,
            handoffs,
            metrics,
            alerts,
            persistence,
            shutdown: Arc::new(shutdown),
            tasks: Arc::new(Mutex::new(tasks)),
            running: Arc::new(AtomicBool::new(false)),
            start_time: Instant::now(),
        })
    }

    /// Record a completed interaction
    pub fn interaction_completed(
        &self,
        agent_id: &str,
        operation: &str,
        duration_ms: f64,
        success: bool,
        cache_hit: bool,
    ) {
        self.stats
            .record(Sample::new(agent_id, operation, duration_ms, success, cache_hit));
    }

    /// Record a sample with its own timestamp
    pub fn record_sample(&self, sample: Sample) {
        self.stats.record(sample);
    }

    /// Start a scoped timer for an operation
    pub fn start_timer(&self, agent_id: &str, operation: &str) -> OperationTimer {
        OperationTimer::start(Arc::clone(&self.stats), agent_id, operation)
    }

    /// Decide a proposed handoff
    pub async fn handoff_proposed(
        &self,
        conversation_id: &str,
        source_agent: &str,
        target_agent: &str,
        confidence_score: f64,
    ) -> HandoffDecision {
        let request =
            HandoffRequest::new(conversation_id, source_agent, target_agent, confidence_score);
        self.handoffs.request_handoff(request).await
    }

    /// Report the execution result of an allowed handoff
    pub async fn handoff_completed(
        &self,
        conversation_id: &str,
        handoff_id: &str,
        success: bool,
    ) -> Result<HandoffRecord> {
        self.handoffs
            .complete_handoff(conversation_id, handoff_id, success)
            .await
    }

    pub fn acknowledge(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        self.alerts.acknowledge(alert_id, actor)
    }

    pub fn get_active_alerts(&self) -> Vec<Alert> {
        self.alerts.get_active_alerts()
    }

    pub fn get_escalation_status(&self) -> Vec<EscalationState> {
        self.alerts.get_escalation_status()
    }

    /// System summary over the evaluation window
    pub fn system_summary(&self) -> Result<SystemSummary> {
        self.metrics
            .system_summary(&self.config.alerting().evaluation_window)
    }

    /// Agent health over the evaluation window
    pub fn health_report(&self) -> Result<HealthReport> {
        self.metrics
            .health_report(&self.config.alerting().evaluation_window)
    }

    /// Evaluate, sweep and dispatch once, as the background loops would
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let mut report = TickReport::default();

        if self.config.alerting().enabled {
            let window = &self.config.alerting().evaluation_window;
            report.alerts_fired = self.metrics.feed_alerting_at(&self.alerts, window, now)?.len();
        }
        report.escalated = self.alerts.run_escalation_sweep(now).len();
        report.delivered = self.alerts.process_pending().await?;
        self.maintain(now);

        Ok(report)
    }

    /// Reclaim idle stats keys and expired handoff history
    pub fn maintain(&self, now: DateTime<Utc>) {
        let compacted = self.stats.compact_at(now);
        let pruned = self.handoffs.prune(now);
        if compacted + pruned > 0 {
            debug!(
                "Maintenance removed {} stats keys and {} handoff records",
                compacted, pruned
            );
        }
    }

    /// Start the background loops
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Handoff sentinel already started");
            return Ok(());
        }
        info!("Starting handoff sentinel");
        self.start_background_tasks();
        Ok(())
    }

    /// Signal every loop to stop and wait for them.
    ///
    /// A pass already in progress finishes first; queued notifications are then
    /// delivered one last time.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Stopping handoff sentinel");
        self.running.store(false, Ordering::Release);
        self.shutdown.send_replace(true);

        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }

        let delivered = self.alerts.process_pending().await?;
        if delivered > 0 {
            debug!("Delivered {} notifications during shutdown", delivered);
        }

        info!("Handoff sentinel stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &Arc<RollingStatsStore> {
        &self.stats
    }

    pub fn handoffs(&self) -> &Arc<HandoffCoordinator> {
        &self.handoffs
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    pub fn alerts(&self) -> &Arc<AlertEngine> {
        &self.alerts
    }

    /// Records dropped because the persistence queue was full
    pub fn dropped_persistence_records(&self) -> u64 {
        self.persistence.dropped_records()
    }
}
