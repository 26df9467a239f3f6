use arc_swap::ArcSwap;
use std::sync::Arc;

use super::Config;

/// Shared configuration holder.
///
/// Readers take lock-free snapshots; clones share the same slot. Components
/// read the snapshot when they start, so a page opened later sees the values
/// current at that moment.
pub struct ConfigHandle {
    inner: Arc<ArcSwap<Config>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current config snapshot. Lock-free.
    pub fn load(&self) -> arc_swap::Guard<Arc<Config>> {
        self.inner.load()
    }

    pub fn load_full(&self) -> Arc<Config> {
        self.inner.load_full()
    }
}

impl Clone for ConfigHandle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
