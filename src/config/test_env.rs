use std::sync::{LazyLock, Mutex};

pub(super) static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(super) struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl EnvVarGuard {
    pub(super) fn set(key: &'static str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        // SAFETY: Test-only helper. All tests using EnvVarGuard acquire
        // ENV_LOCK first, serializing concurrent env-var access.
        unsafe {
            std::env::set_var(key, value);
        }
        Self { key, previous }
    }

    pub(super) fn unset(key: &'static str) -> Self {
        let previous = std::env::var(key).ok();
        // SAFETY: Test-only helper. ENV_LOCK serializes access.
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: ENV_LOCK is still held by the enclosing test.
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }
}

/// Clear every override the loader reads.
pub(super) fn clear_overrides() -> Vec<EnvVarGuard> {
    [
        "ADPACE_POLL_INTERVAL_MS",
        "ADPACE_SETTINGS_PATH",
        "ADPACE_OBSERVABILITY",
        "ADPACE_LOG_LEVEL",
        "ADPACE_LANG",
    ]
    .into_iter()
    .map(EnvVarGuard::unset)
    .collect()
}
