use crate::classifier::Classification;
use std::time::Duration;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    CycleEvaluated {
        page: String,
        trigger: &'static str,
        classification: Classification,
        duration: Duration,
    },
    StatusChanged {
        page: String,
        classification: Classification,
        speed: Option<f64>,
    },
    SpeedApplied {
        page: String,
        rate: f64,
    },
    PassiveCapture {
        page: String,
        rate: f64,
    },
    ContextInvalidated {
        page: String,
    },
    NotificationDropped {
        target: String,
        kind: String,
    },
    Error {
        component: String,
        message: String,
    },
}

/// Numeric metrics
#[derive(Debug, Clone)]
pub enum ObserverMetric {
    CycleLatency(Duration),
    /// Mutation batches folded into a single evaluation.
    CoalescedBatches(u64),
    ActivePages(u64),
    AttachRetries(u64),
}

/// Core observability trait, implemented by each backend
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
