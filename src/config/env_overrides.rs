use super::Config;
use super::schema::POLL_INTERVAL_RANGE_MS;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("ADPACE_POLL_INTERVAL_MS")
            && let Ok(ms) = raw.trim().parse::<u64>()
        {
            if POLL_INTERVAL_RANGE_MS.contains(&ms) {
                self.watcher.poll_interval_ms = ms;
            } else {
                tracing::warn!(value = ms, "ADPACE_POLL_INTERVAL_MS out of range, ignored");
            }
        }

        if let Ok(path) = std::env::var("ADPACE_SETTINGS_PATH")
            && !path.is_empty()
        {
            self.settings_path = Some(PathBuf::from(path));
        }

        if let Ok(backend) = std::env::var("ADPACE_OBSERVABILITY")
            && !backend.is_empty()
        {
            self.observability.backend = backend;
        }

        if let Ok(level) = std::env::var("ADPACE_LOG_LEVEL")
            && !level.is_empty()
        {
            self.log_level = level.trim().to_lowercase();
        }
    }
}
