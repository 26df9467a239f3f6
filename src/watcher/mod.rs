//! Page observer context.
//!
//! One task per page owns the classifier, the speed controller and every
//! trigger source. Triggers (structural mutations, the polling timer, rate
//! change events, inbound messages) are multiplexed with `tokio::select!`,
//! so evaluations never overlap and a burst of mutations costs one
//! evaluation.

use crate::bus::{BadgePayload, BusClient, ContextId, Envelope, Hub, Mailbox, Message, Response};
use crate::classifier::{IndicatorSet, classify};
use crate::config::WatcherConfig;
use crate::controller::{ApplyOutcome, SpeedController};
use crate::diagnostics::health;
use crate::error::HostError;
use crate::observability::{Observer, ObserverEvent, ObserverMetric};
use crate::page::{MutationBatch, MutationFilter, PageHost, RateSubscription, VideoElement};
use crate::settings::Settings;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What woke the observer up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Trigger {
    Startup,
    Mutation,
    Poll,
    RateChange,
    SettingsUpdate,
}

/// Why the observer loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WatcherExit {
    /// The page went away (unload).
    Shutdown,
    /// The host invalidated this observer instance.
    Invalidated,
    /// The mailbox was closed from outside.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatcherOptions {
    pub poll_interval: Duration,
    pub attach_attempts: u32,
    pub attach_backoff: Duration,
    pub request_timeout: Duration,
    pub filter: MutationFilter,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self::from_config(&WatcherConfig::default(), MutationFilter::default())
    }
}

impl WatcherOptions {
    pub fn from_config(config: &WatcherConfig, filter: MutationFilter) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            attach_attempts: config.attach_attempts.max(1),
            attach_backoff: Duration::from_millis(config.attach_backoff_ms.max(1)),
            request_timeout: config.request_timeout(),
            filter,
        }
    }
}

/// Handle to a running observer task.
pub struct WatcherHandle {
    id: ContextId,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<WatcherExit>,
}

impl WatcherHandle {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal page unload and wait for teardown.
    pub async fn shutdown(self) -> WatcherExit {
        self.shutdown.send_replace(true);
        self.join().await
    }

    /// Wait for the observer to exit on its own.
    pub async fn join(self) -> WatcherExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(error) => {
                tracing::error!(page = %self.id, %error, "observer task failed");
                WatcherExit::Disconnected
            }
        }
    }
}

/// Start observing `host` as page `id`.
///
/// The mailbox is registered before this returns, so the page answers PING
/// as soon as its task gets scheduled.
pub fn spawn_watcher(
    id: ContextId,
    host: Arc<dyn PageHost>,
    hub: &Hub,
    indicators: Arc<IndicatorSet>,
    observer: Arc<dyn Observer>,
    options: WatcherOptions,
) -> WatcherHandle {
    let mailbox = hub.register(id);
    let (shutdown, shutdown_rx) = watch::channel(false);
    let watcher = PageWatcher::new(
        id,
        host,
        BusClient::new(id, hub.clone()),
        indicators,
        observer,
        options,
    );
    let task = tokio::spawn(watcher.run(mailbox, shutdown_rx));
    WatcherHandle { id, shutdown, task }
}

/// Structural observer attachment, retried with exponential backoff while the
/// player container is missing.
#[derive(Debug, Clone, Copy)]
struct AttachSchedule {
    attempts: u32,
    next_at: Option<Instant>,
}

pub struct PageWatcher {
    id: ContextId,
    component: String,
    host: Arc<dyn PageHost>,
    client: BusClient,
    indicators: Arc<IndicatorSet>,
    settings: Arc<ArcSwap<Settings>>,
    controller: SpeedController,
    observer: Arc<dyn Observer>,
    options: WatcherOptions,
    mutations: Option<mpsc::Receiver<MutationBatch>>,
    subscription: Option<RateSubscription>,
    attach: AttachSchedule,
    /// Latest captured record, drained by the persister task.
    captured: watch::Sender<Option<Settings>>,
}

impl PageWatcher {
    pub fn new(
        id: ContextId,
        host: Arc<dyn PageHost>,
        client: BusClient,
        indicators: Arc<IndicatorSet>,
        observer: Arc<dyn Observer>,
        options: WatcherOptions,
    ) -> Self {
        Self {
            id,
            component: id.to_string(),
            host,
            client,
            indicators,
            settings: Arc::new(ArcSwap::from_pointee(Settings::default())),
            controller: SpeedController::new(),
            observer,
            options,
            mutations: None,
            subscription: None,
            attach: AttachSchedule {
                attempts: 0,
                next_at: None,
            },
            captured: watch::channel(None).0,
        }
    }

    /// Shared view of the settings cache.
    pub fn settings(&self) -> Arc<ArcSwap<Settings>> {
        Arc::clone(&self.settings)
    }

    pub async fn run(
        mut self,
        mut mailbox: Mailbox,
        mut shutdown: watch::Receiver<bool>,
    ) -> WatcherExit {
        health::mark_component_ok(&self.component);
        spawn_persister(
            self.id,
            self.client.clone(),
            self.captured.subscribe(),
            self.options.request_timeout,
        );
        self.load_settings().await;
        self.try_attach();

        let period = self.options.poll_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = match self.cycle(Trigger::Startup) {
            Ok(()) => {
                self.event_loop(&mut mailbox, &mut shutdown, &mut interval)
                    .await
            }
            Err(exit) => exit,
        };

        self.teardown(exit, &mut mailbox);
        exit
    }

    async fn event_loop(
        &mut self,
        mailbox: &mut Mailbox,
        shutdown: &mut watch::Receiver<bool>,
        interval: &mut tokio::time::Interval,
    ) -> WatcherExit {
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return WatcherExit::Shutdown;
                    }
                }
                batch = next_batch(&mut self.mutations) => {
                    if let Err(exit) = self.on_mutations(batch) {
                        return exit;
                    }
                }
                rate = next_rate(&mut self.subscription) => {
                    if let Err(exit) = self.on_rate_change(rate) {
                        return exit;
                    }
                }
                envelope = mailbox.recv() => {
                    let Some(envelope) = envelope else {
                        return WatcherExit::Disconnected;
                    };
                    if let Err(exit) = self.handle_envelope(envelope) {
                        return exit;
                    }
                }
                () = attach_due(self.attach.next_at) => self.try_attach(),
                _ = interval.tick() => {
                    if let Err(exit) = self.on_tick() {
                        return exit;
                    }
                }
            }
        }
    }

    /// Seed the cache from the coordinator; defaults when it cannot answer.
    async fn load_settings(&self) {
        let reply = self
            .client
            .request_with_timeout(
                ContextId::Background,
                Message::GetSettings,
                self.options.request_timeout,
            )
            .await
            .and_then(|response| response.into_result("background"));
        match reply {
            Ok(Response {
                settings: Some(settings),
                ..
            }) => self.settings.store(Arc::new(settings.sanitized())),
            Ok(_) => tracing::warn!(page = %self.id, "settings response carried no record"),
            Err(error) => {
                tracing::warn!(page = %self.id, %error, "could not load settings, using defaults");
            }
        }
    }

    fn on_tick(&mut self) -> Result<(), WatcherExit> {
        if let Err(error) = self.host.probe() {
            if error.is_terminal() {
                return Err(WatcherExit::Invalidated);
            }
            tracing::debug!(page = %self.id, %error, "host probe failed");
        }
        self.cycle(Trigger::Poll)
    }

    fn on_mutations(&mut self, batch: Option<MutationBatch>) -> Result<(), WatcherExit> {
        let Some(_) = batch else {
            tracing::debug!(page = %self.id, "mutation stream closed, reattaching");
            self.mutations = None;
            self.attach = AttachSchedule {
                attempts: 0,
                next_at: Some(Instant::now()),
            };
            return Ok(());
        };
        let mut coalesced: u64 = 1;
        if let Some(rx) = self.mutations.as_mut() {
            while rx.try_recv().is_ok() {
                coalesced += 1;
            }
        }
        if coalesced > 1 {
            self.observer
                .record_metric(&ObserverMetric::CoalescedBatches(coalesced));
        }
        self.cycle(Trigger::Mutation)
    }

    fn on_rate_change(&mut self, rate: Option<f64>) -> Result<(), WatcherExit> {
        if rate.is_none() {
            // Element gone; the next cycle resubscribes to its successor.
            self.subscription = None;
            return Ok(());
        }
        let Some(video) = self.host.video() else {
            return Ok(());
        };
        if self
            .subscription
            .as_ref()
            .is_none_or(|subscription| subscription.video() != video.id())
        {
            return Ok(());
        }
        let settings = **self.settings.load();
        if let Some(rate) = self.controller.observe_rate(video.as_ref(), &settings) {
            self.capture(rate, settings);
            return self.cycle(Trigger::RateChange);
        }
        Ok(())
    }

    fn handle_envelope(&mut self, envelope: Envelope) -> Result<(), WatcherExit> {
        let Envelope {
            from,
            message,
            reply,
        } = envelope;
        let kind = message.kind();
        let mut result = Ok(());
        let response = match message {
            Message::Ping => Response::ok(),
            Message::GetAdStatus => Response::with_status(self.controller.status()),
            Message::UpdateSettings(settings) => {
                self.settings.store(Arc::new(settings.sanitized()));
                tracing::debug!(page = %self.id, %from, "settings replaced");
                result = self.cycle(Trigger::SettingsUpdate);
                Response::ok()
            }
            _ => {
                tracing::debug!(page = %self.id, %from, %kind, "unsupported message");
                Response::failure(format!("unsupported message type: {kind}"))
            }
        };
        if let Some(reply) = reply {
            reply.respond(response);
        }
        result
    }

    fn try_attach(&mut self) {
        self.attach.attempts += 1;
        match self.host.attach_mutations(&self.options.filter) {
            Ok(rx) => {
                tracing::debug!(page = %self.id, attempts = self.attach.attempts, "structural observer attached");
                self.observer
                    .record_metric(&ObserverMetric::AttachRetries(u64::from(self.attach.attempts)));
                self.mutations = Some(rx);
                self.attach.next_at = None;
            }
            Err(error) if error.is_terminal() => {
                // The next probe tears the observer down.
                self.attach.next_at = None;
            }
            Err(error) => {
                if self.attach.attempts >= self.options.attach_attempts {
                    tracing::warn!(
                        page = %self.id,
                        attempts = self.attach.attempts,
                        %error,
                        "player container never mounted, relying on polling"
                    );
                    self.attach.next_at = None;
                } else {
                    let exponent = self.attach.attempts.saturating_sub(1).min(16);
                    let delay = self.options.attach_backoff.saturating_mul(1 << exponent);
                    self.attach.next_at = Some(Instant::now() + delay);
                }
            }
        }
    }

    /// One evaluation: snapshot, classify, apply, notify.
    fn cycle(&mut self, trigger: Trigger) -> Result<(), WatcherExit> {
        let started = std::time::Instant::now();
        let snapshot = match self.host.snapshot() {
            Ok(snapshot) => snapshot,
            Err(HostError::Invalidated) => return Err(WatcherExit::Invalidated),
            Err(error) => {
                tracing::warn!(page = %self.id, %trigger, %error, "evaluation skipped");
                health::mark_component_error(&self.component, &error);
                self.observer.record_event(&ObserverEvent::Error {
                    component: self.component.clone(),
                    message: error.to_string(),
                });
                return Ok(());
            }
        };

        let verdict = classify(&snapshot, &self.indicators);
        let video = self.host.video();
        self.sync_subscription(video.as_deref());

        let settings = **self.settings.load();
        let outcome = self
            .controller
            .apply(verdict.classification, &settings, video.as_deref());

        if let Some(rate) = outcome.captured {
            self.capture(rate, settings);
        }
        if let Some(rate) = outcome.applied_rate {
            self.observer.record_event(&ObserverEvent::SpeedApplied {
                page: self.component.clone(),
                rate,
            });
        }
        if outcome.changed {
            tracing::info!(
                page = %self.id,
                %trigger,
                classification = %verdict.classification,
                ad_evidence = ?verdict.ad_evidence,
                music_evidence = ?verdict.music_evidence,
                speed = ?outcome.status.current_speed,
                "classification changed"
            );
            health::set_component_detail(
                &self.component,
                verdict.classification.to_string(),
            );
            self.announce(&outcome);
        }

        let duration = started.elapsed();
        self.observer.record_event(&ObserverEvent::CycleEvaluated {
            page: self.component.clone(),
            trigger: trigger.into(),
            classification: verdict.classification,
            duration,
        });
        self.observer
            .record_metric(&ObserverMetric::CycleLatency(duration));
        health::mark_component_ok(&self.component);
        Ok(())
    }

    /// Keep the rate listener bound to the current element.
    fn sync_subscription(&mut self, video: Option<&dyn VideoElement>) {
        match (video, self.subscription.as_ref()) {
            (Some(video), Some(current)) if current.video() == video.id() => {}
            (Some(video), _) => {
                self.subscription = Some(video.subscribe_rate_changes());
            }
            (None, Some(_)) => self.subscription = None,
            (None, None) => {}
        }
    }

    fn announce(&self, outcome: &ApplyOutcome) {
        let status = outcome.status;
        self.observer.record_event(&ObserverEvent::StatusChanged {
            page: self.component.clone(),
            classification: status.classification,
            speed: status.current_speed,
        });
        let messages = [
            Message::AdStatusChanged(status),
            Message::UpdateBadge(BadgePayload {
                speed: status.current_speed,
            }),
        ];
        for message in messages {
            let kind = message.kind();
            if !self.client.notify(ContextId::Background, message) {
                self.observer.record_event(&ObserverEvent::NotificationDropped {
                    target: ContextId::Background.to_string(),
                    kind: kind.to_string(),
                });
            }
        }
    }

    /// Adopt a manually chosen speed and hand it to the coordinator.
    fn capture(&self, rate: f64, settings: Settings) {
        let updated = settings.with_video_speed(rate);
        self.settings.store(Arc::new(updated));
        self.observer.record_event(&ObserverEvent::PassiveCapture {
            page: self.component.clone(),
            rate,
        });
        tracing::info!(page = %self.id, rate, "captured manual speed change");
        self.captured.send_replace(Some(updated));
    }

    fn teardown(&mut self, exit: WatcherExit, mailbox: &mut Mailbox) {
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
        self.mutations = None;
        self.client.hub().unregister(self.id);
        // Answer anything already queued so no requester hangs.
        while let Some(envelope) = mailbox.try_recv() {
            envelope.respond(Response::failure("page observer stopped"));
        }

        match exit {
            WatcherExit::Invalidated => {
                tracing::warn!(page = %self.id, "context invalidated, observer stopped");
                self.observer.record_event(&ObserverEvent::ContextInvalidated {
                    page: self.component.clone(),
                });
                health::mark_component_error(&self.component, "context invalidated");
            }
            WatcherExit::Shutdown | WatcherExit::Disconnected => {
                tracing::debug!(page = %self.id, %exit, "observer stopped");
                health::mark_component_stopped(&self.component);
            }
        }
    }
}

/// Send captured records to the coordinator one at a time, newest wins.
///
/// Ends once the watcher is gone and the last record has been sent.
fn spawn_persister(
    page: ContextId,
    client: BusClient,
    mut captured: watch::Receiver<Option<Settings>>,
    timeout: Duration,
) {
    tokio::spawn(async move {
        while captured.changed().await.is_ok() {
            let Some(settings) = *captured.borrow_and_update() else {
                continue;
            };
            let result = client
                .request_with_timeout(
                    ContextId::Background,
                    Message::UpdateSettings(settings),
                    timeout,
                )
                .await
                .and_then(|response| response.into_result("background"));
            if let Err(error) = result {
                tracing::warn!(%page, %error, "failed to persist captured speed");
            }
        }
    });
}

async fn next_batch(rx: &mut Option<mpsc::Receiver<MutationBatch>>) -> Option<MutationBatch> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_rate(subscription: &mut Option<RateSubscription>) -> Option<f64> {
    match subscription {
        Some(subscription) => subscription.changed().await,
        None => std::future::pending().await,
    }
}

async fn attach_due(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
