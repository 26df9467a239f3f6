use super::traits::{Observer, ObserverEvent, ObserverMetric};

/// Observer that records nothing
pub struct NoopObserver;

impl Observer for NoopObserver {
    #[inline(always)]
    fn record_event(&self, _event: &ObserverEvent) {}

    #[inline(always)]
    fn record_metric(&self, _metric: &ObserverMetric) {}

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_name() {
        assert_eq!(NoopObserver.name(), "noop");
    }

    #[test]
    fn noop_records_and_flushes_without_panic() {
        let obs = NoopObserver;
        obs.record_event(&ObserverEvent::ContextInvalidated {
            page: "page:2".into(),
        });
        obs.record_metric(&ObserverMetric::ActivePages(1));
        obs.flush();
    }
}
