pub mod log;
pub mod multi;
pub mod noop;
pub mod traits;

pub use self::log::LogObserver;
pub use multi::MultiObserver;
pub use noop::NoopObserver;
pub use traits::{Observer, ObserverEvent, ObserverMetric};

use crate::config::ObservabilityConfig;

fn create_backend(name: &str) -> Box<dyn Observer> {
    match name {
        "log" => Box::new(LogObserver::new()),
        "none" | "noop" | "" => Box::new(NoopObserver),
        other => {
            tracing::warn!("Unknown observability backend '{other}', falling back to noop");
            Box::new(NoopObserver)
        }
    }
}

/// Factory: create the right observer from config.
///
/// A comma-separated backend list builds a [`MultiObserver`].
pub fn create_observer(config: &ObservabilityConfig) -> Box<dyn Observer> {
    let names: Vec<&str> = config
        .backend
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    match names.as_slice() {
        [] => Box::new(NoopObserver),
        [single] => create_backend(single),
        many => Box::new(MultiObserver::new(
            many.iter().map(|name| create_backend(name)).collect(),
        )),
    }
}
