//! Process runtime: one coordinator, any number of page observers, and the
//! panel clients that talk to them, all wired through one [`Hub`].

use crate::bus::{ContextId, Hub, Mailbox};
use crate::classifier::IndicatorSet;
use crate::config::ConfigHandle;
use crate::coordinator::{self, Coordinator, StatusEvent};
use crate::observability::Observer;
use crate::page::PageHost;
use crate::panel::Panel;
use crate::settings::SettingsStore;
use crate::watcher::{WatcherExit, WatcherHandle, WatcherOptions, spawn_watcher};
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

mod state;
mod supervisor;

pub use state::{RuntimeState, read_state, spawn_state_writer, write_state};
pub use supervisor::{RestartPolicy, spawn_component_supervisor};

pub struct Runtime {
    hub: Hub,
    coordinator: Coordinator,
    config: ConfigHandle,
    indicators: Arc<IndicatorSet>,
    observer: Arc<dyn Observer>,
    shutdown: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
    pages: BTreeMap<ContextId, WatcherHandle>,
    next_page: u32,
}

impl Runtime {
    /// Install the settings record and start the supervised coordinator.
    ///
    /// The coordinator's mailbox is registered before this returns, so pages
    /// opened right away can fetch their settings.
    pub async fn start(
        config: ConfigHandle,
        store: Arc<dyn SettingsStore>,
        observer: Arc<dyn Observer>,
    ) -> Result<Self> {
        let snapshot = config.load_full();
        let indicators = Arc::new(snapshot.indicator_set()?);
        let hub = Hub::new();
        let coordinator = Coordinator::new(store, hub.clone(), Arc::clone(&observer));
        if let Err(error) = coordinator.install().await {
            tracing::warn!(%error, "settings not initialized, pages will use defaults");
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let first = Mutex::new(Some(hub.register(ContextId::Background)));
        let supervisor = spawn_component_supervisor(
            coordinator::COMPONENT,
            RestartPolicy::from(&snapshot.reliability),
            shutdown_rx.clone(),
            {
                let coordinator = coordinator.clone();
                let hub = hub.clone();
                move || {
                    let mailbox = take_or_register(&first, &hub);
                    let coordinator = coordinator.clone();
                    let shutdown = shutdown_rx.clone();
                    async move { coordinator.run(mailbox, shutdown).await }
                }
            },
        );
        tracing::info!(
            rules = indicators.len(),
            observability = observer.name(),
            "runtime started"
        );

        Ok(Self {
            hub,
            coordinator,
            config,
            indicators,
            observer,
            shutdown,
            supervisor,
            pages: BTreeMap::new(),
            next_page: 1,
        })
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.coordinator.subscribe()
    }

    /// Start an observer on `host`, using the watcher settings current now.
    pub fn open_page(&mut self, host: Arc<dyn PageHost>) -> ContextId {
        let id = ContextId::Page(self.next_page);
        self.next_page += 1;
        let config = self.config.load();
        let options = WatcherOptions::from_config(&config.watcher, config.mutation_filter());
        let handle = spawn_watcher(
            id,
            host,
            &self.hub,
            Arc::clone(&self.indicators),
            Arc::clone(&self.observer),
            options,
        );
        self.pages.insert(id, handle);
        tracing::debug!(page = %id, "page opened");
        id
    }

    /// Panel client for `target`, with the configured readiness budget.
    pub fn panel(&self, target: Option<ContextId>) -> Panel {
        let config = self.config.load();
        Panel::new(self.hub.clone(), target)
            .with_retry(config.watcher.ping_policy())
            .with_timeout(config.watcher.request_timeout())
    }

    pub fn pages(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.pages.keys().copied()
    }

    /// Whether the observer for `id` has stopped on its own.
    pub fn page_finished(&self, id: ContextId) -> bool {
        self.pages.get(&id).is_none_or(WatcherHandle::is_finished)
    }

    /// Unload a page and wait for its observer to tear down.
    pub async fn close_page(&mut self, id: ContextId) -> Option<WatcherExit> {
        let handle = self.pages.remove(&id)?;
        Some(handle.shutdown().await)
    }

    /// Close every page, then stop the coordinator.
    pub async fn shutdown(mut self) {
        let pages: Vec<_> = self.pages.keys().copied().collect();
        for id in pages {
            self.close_page(id).await;
        }
        self.shutdown.send_replace(true);
        if let Err(error) = self.supervisor.await {
            tracing::warn!(%error, "coordinator supervisor ended abnormally");
        }
        self.observer.flush();
        tracing::info!("runtime stopped");
    }
}

/// The first run uses the mailbox registered at startup; restarts register
/// a fresh one.
fn take_or_register(first: &Mutex<Option<Mailbox>>, hub: &Hub) -> Mailbox {
    first
        .lock()
        .ok()
        .and_then(|mut slot| slot.take())
        .unwrap_or_else(|| hub.register(ContextId::Background))
}
