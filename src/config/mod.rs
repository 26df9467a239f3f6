mod env_overrides;
mod hot_reload;
mod loader;
mod locale;
mod schema;
#[cfg(test)]
mod test_env;

pub use hot_reload::ConfigHandle;
pub use schema::{
    Config, IndicatorsConfig, ObservabilityConfig, POLL_INTERVAL_RANGE_MS, ReliabilityConfig,
    WatcherConfig,
};
