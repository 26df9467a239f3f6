//! Long-lived coordinator context.
//!
//! Owns the persisted settings record, answers settings requests, fans
//! settings changes out to page observers and republishes their status
//! changes to whoever subscribed (panels, the CLI).

use crate::bus::{BadgePayload, BusClient, ContextId, Envelope, Hub, Mailbox, Message, Response};
use crate::controller::Status;
use crate::diagnostics::health;
use crate::error::StorageError;
use crate::observability::{Observer, ObserverEvent};
use crate::settings::{self, Settings, SettingsStore};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, watch};

/// Health registry key.
pub const COMPONENT: &str = "coordinator";

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// A page's status, as republished by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusEvent {
    pub page: ContextId,
    pub status: Status,
}

#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn SettingsStore>,
    client: BusClient,
    status_tx: broadcast::Sender<StatusEvent>,
    badges: Arc<RwLock<BTreeMap<ContextId, String>>>,
    observer: Arc<dyn Observer>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn SettingsStore>, hub: Hub, observer: Arc<dyn Observer>) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            store,
            client: BusClient::new(ContextId::Background, hub),
            status_tx,
            badges: Arc::new(RwLock::new(BTreeMap::new())),
            observer,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// Badge text last reported by `page`.
    pub fn badge(&self, page: ContextId) -> Option<String> {
        self.badges
            .read()
            .ok()
            .and_then(|badges| badges.get(&page).cloned())
    }

    pub fn badges(&self) -> BTreeMap<ContextId, String> {
        self.badges
            .read()
            .map(|badges| badges.clone())
            .unwrap_or_default()
    }

    /// First-install initialization: persist defaults when nothing is stored.
    pub async fn install(&self) -> Result<Settings, StorageError> {
        let settings = settings::initialize_defaults(self.store.as_ref()).await;
        match &settings {
            Ok(_) => health::mark_component_ok(COMPONENT),
            Err(error) => {
                tracing::error!(store = self.store.name(), %error, "settings initialization failed");
                health::mark_component_error(COMPONENT, error);
            }
        }
        settings
    }

    /// Serve `mailbox` until shutdown is signalled or every sender is gone.
    pub async fn run(
        &self,
        mut mailbox: Mailbox,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        health::mark_component_ok(COMPONENT);
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                envelope = mailbox.recv() => match envelope {
                    Some(envelope) => self.handle(envelope).await,
                    None => anyhow::bail!("coordinator mailbox closed"),
                },
            }
        }
        health::mark_component_stopped(COMPONENT);
        Ok(())
    }

    /// Handle one envelope, answering it when a reply is expected.
    pub async fn handle(&self, envelope: Envelope) {
        let Envelope {
            from,
            message,
            reply,
        } = envelope;
        let kind = message.kind();
        let mut saved = None;
        let response = match message {
            Message::GetSettings => {
                Response::with_settings(settings::load_or_default(self.store.as_ref()).await)
            }
            Message::UpdateSettings(settings) => match self.persist(from, settings).await {
                Ok(settings) => {
                    saved = Some(settings);
                    Response::ok()
                }
                Err(error) => Response::failure(error.to_string()),
            },
            Message::Ping => Response::ok(),
            Message::AdStatusChanged(status) => {
                self.publish_status(from, status);
                Response::ok()
            }
            Message::UpdateBadge(badge) => {
                self.record_badge(from, badge);
                Response::ok()
            }
            Message::GetAdStatus => {
                tracing::debug!(%from, %kind, "misdirected request");
                Response::failure(format!("unsupported message type: {kind}"))
            }
        };
        if let Some(reply) = reply {
            reply.respond(response);
        }
        if let Some(settings) = saved {
            self.forward_settings(from, settings);
        }
    }

    async fn persist(&self, from: ContextId, settings: Settings) -> Result<Settings, StorageError> {
        let settings = settings.sanitized();
        if let Err(error) = self.store.save(&settings).await {
            tracing::error!(%from, %error, "failed to persist settings");
            health::mark_component_error(COMPONENT, &error);
            self.observer.record_event(&ObserverEvent::Error {
                component: COMPONENT.into(),
                message: error.to_string(),
            });
            return Err(error);
        }
        health::mark_component_ok(COMPONENT);
        tracing::info!(
            %from,
            ad_speed = settings.ad_speed,
            video_speed = settings.video_speed,
            enabled = settings.enabled,
            "settings updated"
        );
        Ok(settings)
    }

    /// Push a saved record to every page observer except its author.
    fn forward_settings(&self, from: ContextId, settings: Settings) {
        for page in self.client.hub().pages() {
            if page == from {
                continue;
            }
            if !self.client.notify(page, Message::UpdateSettings(settings)) {
                self.observer.record_event(&ObserverEvent::NotificationDropped {
                    target: page.to_string(),
                    kind: "UPDATE_SETTINGS".into(),
                });
            }
        }
    }

    fn publish_status(&self, from: ContextId, status: Status) {
        tracing::debug!(
            %from,
            classification = %status.classification,
            speed = ?status.current_speed,
            "status changed"
        );
        // No subscribers is fine.
        let _ = self.status_tx.send(StatusEvent { page: from, status });
    }

    fn record_badge(&self, from: ContextId, badge: BadgePayload) {
        if let Ok(mut badges) = self.badges.write() {
            badges.insert(from, badge.text());
        }
    }
}
