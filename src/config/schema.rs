use crate::bus::RetryPolicy;
use crate::classifier::{IndicatorRule, IndicatorSet};
use crate::error::ConfigError;
use crate::page::MutationFilter;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Accepted polling interval range, in milliseconds.
pub const POLL_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 250..=5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml, computed at load time
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Settings record location. Defaults to `settings.json` beside the config.
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub indicators: IndicatorsConfig,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_locale() -> String {
    "en".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            settings_path: None,
            log_level: default_log_level(),
            locale: default_locale(),
            observability: ObservabilityConfig::default(),
            watcher: WatcherConfig::default(),
            reliability: ReliabilityConfig::default(),
            indicators: IndicatorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "none" | "log", or a comma-separated list
    pub backend: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: "none".into(),
        }
    }
}

/// Page observer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_attach_attempts")]
    pub attach_attempts: u32,
    #[serde(default = "default_attach_backoff_ms")]
    pub attach_backoff_ms: u64,
    #[serde(default = "default_ping_attempts")]
    pub ping_attempts: u32,
    #[serde(default = "default_ping_backoff_ms")]
    pub ping_backoff_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How often `watch` re-reads the page file.
    #[serde(default = "default_file_refresh_ms")]
    pub file_refresh_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_attach_attempts() -> u32 {
    5
}

fn default_attach_backoff_ms() -> u64 {
    250
}

fn default_ping_attempts() -> u32 {
    3
}

fn default_ping_backoff_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_file_refresh_ms() -> u64 {
    250
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            attach_attempts: default_attach_attempts(),
            attach_backoff_ms: default_attach_backoff_ms(),
            ping_attempts: default_ping_attempts(),
            ping_backoff_ms: default_ping_backoff_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            file_refresh_ms: default_file_refresh_ms(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn file_refresh(&self) -> Duration {
        Duration::from_millis(self.file_refresh_ms.max(10))
    }

    /// Readiness probing used by the panel.
    pub fn ping_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.ping_attempts,
            backoff: Duration::from_millis(self.ping_backoff_ms),
            attempt_timeout: Duration::from_millis(self.ping_backoff_ms.max(1)),
        }
    }
}

/// Component supervision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Consecutive failures tolerated before giving up. 0 means unlimited.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default = "default_state_flush_secs")]
    pub state_flush_secs: u64,
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_max_restarts() -> u32 {
    10
}

fn default_state_flush_secs() -> u64 {
    5
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_restarts: default_max_restarts(),
            state_flush_secs: default_state_flush_secs(),
        }
    }
}

/// Indicator rule table. Empty means the built-in table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorsConfig {
    #[serde(default)]
    pub mutation_root: Option<String>,
    #[serde(default)]
    pub rules: Vec<IndicatorRule>,
}

impl Config {
    fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
    }

    /// Where the settings record lives.
    pub fn settings_file(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(|| self.config_dir().join("settings.json"))
    }

    /// Health snapshot written by long-running commands.
    pub fn state_file(&self) -> PathBuf {
        self.config_dir().join("runtime_state.json")
    }

    pub fn indicator_set(&self) -> Result<IndicatorSet, ConfigError> {
        if self.indicators.rules.is_empty() {
            Ok(IndicatorSet::builtin())
        } else {
            IndicatorSet::compile(&self.indicators.rules)
        }
    }

    pub fn mutation_filter(&self) -> MutationFilter {
        let mut filter = MutationFilter::default();
        if let Some(root) = &self.indicators.mutation_root {
            filter.root.clone_from(root);
        }
        filter
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let poll = self.watcher.poll_interval_ms;
        if !POLL_INTERVAL_RANGE_MS.contains(&poll) {
            return Err(ConfigError::Validation(format!(
                "watcher.poll_interval_ms must be within {}..={}, got {poll}",
                POLL_INTERVAL_RANGE_MS.start(),
                POLL_INTERVAL_RANGE_MS.end()
            )));
        }
        if self.watcher.attach_attempts == 0 {
            return Err(ConfigError::Validation(
                "watcher.attach_attempts must be at least 1".into(),
            ));
        }
        if self.watcher.ping_attempts == 0 {
            return Err(ConfigError::Validation(
                "watcher.ping_attempts must be at least 1".into(),
            ));
        }
        if self.reliability.max_backoff_ms < self.reliability.initial_backoff_ms {
            return Err(ConfigError::Validation(
                "reliability.max_backoff_ms must not be below initial_backoff_ms".into(),
            ));
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Validation(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        if let Some(root) = &self.indicators.mutation_root
            && scraper::Selector::parse(root).is_err()
        {
            return Err(ConfigError::Validation(format!(
                "indicators.mutation_root is not a valid selector: {root}"
            )));
        }
        self.indicator_set().map(|_| ())
    }
}
