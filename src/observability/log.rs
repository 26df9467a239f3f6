use super::traits::{Observer, ObserverEvent, ObserverMetric};
use tracing::{info, warn};

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Log-based observer built on tracing
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::CycleEvaluated {
                page,
                trigger,
                classification,
                duration,
            } => {
                info!(
                    page = %page,
                    trigger = %trigger,
                    classification = %classification,
                    duration_ms = millis(*duration),
                    "cycle.evaluated"
                );
            }
            ObserverEvent::StatusChanged {
                page,
                classification,
                speed,
            } => {
                info!(page = %page, classification = %classification, speed = ?speed, "status.changed");
            }
            ObserverEvent::SpeedApplied { page, rate } => {
                info!(page = %page, rate = rate, "speed.applied");
            }
            ObserverEvent::PassiveCapture { page, rate } => {
                info!(page = %page, rate = rate, "speed.captured");
            }
            ObserverEvent::ContextInvalidated { page } => {
                warn!(page = %page, "context.invalidated");
            }
            ObserverEvent::NotificationDropped { target, kind } => {
                info!(target_context = %target, kind = %kind, "notification.dropped");
            }
            ObserverEvent::Error { component, message } => {
                warn!(component = %component, error = %message, "error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::CycleLatency(d) => {
                info!(latency_ms = millis(*d), "metric.cycle_latency");
            }
            ObserverMetric::CoalescedBatches(n) => {
                info!(batches = n, "metric.coalesced_batches");
            }
            ObserverMetric::ActivePages(n) => {
                info!(pages = n, "metric.active_pages");
            }
            ObserverMetric::AttachRetries(n) => {
                info!(attempts = n, "metric.attach_retries");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
