//! Optional span recording for instrumented operations
//!
//! Instrumentation always records samples into the stats store. Span recording is a
//! separate capability chosen once at start-up: the default records nothing, the
//! tracing-backed recorder opens a `tracing` span per operation.

use crate::config::TracingConfig;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::field::Empty;

/// A started operation span
pub trait OperationSpan: Send {
    /// Close the span with the operation outcome
    fn end(self: Box<Self>, success: bool, duration_ms: f64);
}

/// Capability for recording operation spans
pub trait SpanRecorder: Send + Sync + Debug {
    /// Start a span for an operation
    fn start(&self, agent_id: &str, operation: &str) -> Box<dyn OperationSpan>;

    /// Recorder name, for diagnostics
    fn name(&self) -> &'static str;
}

/// Recorder that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpanRecorder;

struct NoopSpan;

impl OperationSpan for NoopSpan {
    fn end(self: Box<Self>, _success: bool, _duration_ms: f64) {}
}

impl SpanRecorder for NoopSpanRecorder {
    fn start(&self, _agent_id: &str, _operation: &str) -> Box<dyn OperationSpan> {
        Box::new(NoopSpan)
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Recorder backed by `tracing` spans
#[derive(Debug, Clone)]
pub struct TracingSpanRecorder {
    service_name: String,
}

impl TracingSpanRecorder {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

struct TracingSpan {
    span: tracing::Span,
}

impl OperationSpan for TracingSpan {
    fn end(self: Box<Self>, success: bool, duration_ms: f64) {
        self.span.record("success", success);
        self.span.record("duration_ms", duration_ms);
        let _entered = self.span.enter();
        tracing::debug!("operation finished");
    }
}

impl SpanRecorder for TracingSpanRecorder {
    fn start(&self, agent_id: &str, operation: &str) -> Box<dyn OperationSpan> {
        let span = tracing::info_span!(
            "operation",
            service = %self.service_name,
            agent_id = %agent_id,
            operation = %operation,
            success = Empty,
            duration_ms = Empty,
        );
        Box::new(TracingSpan { span })
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Select the recorder for a configuration
pub fn recorder_from_config(config: &TracingConfig) -> Arc<dyn SpanRecorder> {
    if config.enabled {
        Arc::new(TracingSpanRecorder::new(config.service_name.clone()))
    } else {
        Arc::new(NoopSpanRecorder)
    }
}
