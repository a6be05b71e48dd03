//! Operation instrumentation
//!
//! Timing is captured by a guard that records on `Drop`, so every exit path
//! (success, early `?` return, panic unwinding) produces exactly one sample.

use super::store::RollingStatsStore;
use super::types::Sample;
use crate::monitoring::tracer::OperationSpan;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Scoped timer for one tracked operation
pub struct OperationTimer {
    store: Arc<RollingStatsStore>,
    agent_id: String,
    operation: String,
    started: Instant,
    cache_hit: bool,
    success: Option<bool>,
    span: Option<Box<dyn OperationSpan>>,
}

impl OperationTimer {
    /// Start timing an operation
    pub fn start(
        store: Arc<RollingStatsStore>,
        agent_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        let agent_id = agent_id.into();
        let operation = operation.into();
        let span = store.span_recorder().start(&agent_id, &operation);

        Self {
            store,
            agent_id,
            operation,
            started: Instant::now(),
            cache_hit: false,
            success: None,
            span: Some(span),
        }
    }

    /// Flag the operation as served from cache
    pub fn mark_cache_hit(&mut self) {
        self.cache_hit = true;
    }

    /// Finish as succeeded
    pub fn succeed(mut self) {
        self.success = Some(true);
    }

    /// Finish as failed
    pub fn fail(mut self) {
        self.success = Some(false);
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let duration_ms = self.elapsed_ms();
        // Dropped without an outcome means the operation bailed out
        let success = self.success.unwrap_or(false);

        self.store.record(Sample::new(
            std::mem::take(&mut self.agent_id),
            std::mem::take(&mut self.operation),
            duration_ms,
            success,
            self.cache_hit,
        ));

        if let Some(span) = self.span.take() {
            span.end(success, duration_ms);
        }
    }
}

impl std::fmt::Debug for OperationTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationTimer")
            .field("agent_id", &self.agent_id)
            .field("operation", &self.operation)
            .field("cache_hit", &self.cache_hit)
            .finish()
    }
}

/// Run `f` and record its duration and outcome
pub async fn instrument<F, Fut, T, E>(
    store: &Arc<RollingStatsStore>,
    agent_id: &str,
    operation: &str,
    f: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let timer = OperationTimer::start(Arc::clone(store), agent_id, operation);
    let result = f().await;
    match &result {
        Ok(_) => timer.succeed(),
        Err(_) => timer.fail(),
    }
    result
}
