use super::transport::{Envelope, Mailbox};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Per-context inbound queue depth.
pub const MAILBOX_CAPACITY: usize = 64;

/// Addressable execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextId {
    /// The long-lived coordinator.
    Background,
    /// A page observer, one per open page.
    Page(u32),
    /// The short-lived control panel.
    Panel,
}

impl ContextId {
    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page(_))
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Background => f.write_str("background"),
            Self::Page(id) => write!(f, "page:{id}"),
            Self::Panel => f.write_str("panel"),
        }
    }
}

/// Routing table from context to its mailbox.
///
/// Cheap to clone; all clones share one table.
#[derive(Debug, Clone, Default)]
pub struct Hub {
    routes: Arc<RwLock<BTreeMap<ContextId, mpsc::Sender<Envelope>>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`, replacing any previous registration.
    pub fn register(&self, id: ContextId) -> Mailbox {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        if let Ok(mut routes) = self.routes.write()
            && routes.insert(id, tx).is_some()
        {
            tracing::debug!(context = %id, "replaced existing registration");
        }
        Mailbox::new(id, rx)
    }

    pub fn unregister(&self, id: ContextId) {
        if let Ok(mut routes) = self.routes.write() {
            routes.remove(&id);
        }
    }

    /// Sender for `id`, if something is registered and still listening.
    pub fn route(&self, id: ContextId) -> Option<mpsc::Sender<Envelope>> {
        let routes = self.routes.read().ok()?;
        routes.get(&id).filter(|tx| !tx.is_closed()).cloned()
    }

    pub fn is_registered(&self, id: ContextId) -> bool {
        self.route(id).is_some()
    }

    /// Registered page observers, in id order.
    pub fn pages(&self) -> Vec<ContextId> {
        self.routes
            .read()
            .map(|routes| {
                routes
                    .iter()
                    .filter(|(id, tx)| id.is_page() && !tx.is_closed())
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }
}
