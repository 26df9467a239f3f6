use super::hub::{ContextId, Hub};
use super::message::{Message, MessageType, Response};
use crate::error::BusError;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Reply slot for one request. Consuming it is the only way to answer, so a
/// request is answered at most once; dropping it unanswered surfaces
/// [`BusError::NoResponse`] to the caller.
#[derive(Debug)]
pub struct Responder {
    kind: MessageType,
    tx: oneshot::Sender<Response>,
}

impl Responder {
    pub fn respond(self, response: Response) {
        if self.tx.send(response).is_err() {
            tracing::debug!(kind = %self.kind, "requester gone before response");
        }
    }
}

/// One delivered message.
#[derive(Debug)]
pub struct Envelope {
    pub from: ContextId,
    pub message: Message,
    /// `None` for notifications.
    pub reply: Option<Responder>,
}

impl Envelope {
    /// Answer if a reply is expected; no-op for notifications.
    pub fn respond(self, response: Response) {
        if let Some(reply) = self.reply {
            reply.respond(response);
        }
    }
}

/// Receiving side of a registered context.
#[derive(Debug)]
pub struct Mailbox {
    id: ContextId,
    rx: mpsc::Receiver<Envelope>,
}

impl Mailbox {
    pub(super) fn new(id: ContextId, rx: mpsc::Receiver<Envelope>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

/// Bounded PING readiness probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    /// Wait for each PING answer at most this long.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
            attempt_timeout: Duration::from_millis(500),
        }
    }
}

/// Sending side of the bus for one context.
///
/// Every request is its own future with its own reply slot, so any number of
/// requests can be outstanding at once.
#[derive(Debug, Clone)]
pub struct BusClient {
    me: ContextId,
    hub: Hub,
}

impl BusClient {
    pub fn new(me: ContextId, hub: Hub) -> Self {
        Self { me, hub }
    }

    pub fn id(&self) -> ContextId {
        self.me
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Send a request and wait for its response. No built-in timeout.
    pub async fn request(&self, target: ContextId, message: Message) -> Result<Response, BusError> {
        let route = self
            .hub
            .route(target)
            .ok_or_else(|| BusError::Disconnected(target.to_string()))?;
        let (tx, rx) = oneshot::channel();
        let envelope = Envelope {
            from: self.me,
            reply: Some(Responder {
                kind: message.kind(),
                tx,
            }),
            message,
        };
        route
            .send(envelope)
            .await
            .map_err(|_| BusError::Disconnected(target.to_string()))?;
        rx.await
            .map_err(|_| BusError::NoResponse(target.to_string()))
    }

    pub async fn request_with_timeout(
        &self,
        target: ContextId,
        message: Message,
        timeout: Duration,
    ) -> Result<Response, BusError> {
        tokio::time::timeout(timeout, self.request(target, message))
            .await
            .map_err(|_| BusError::Timeout {
                target: target.to_string(),
                millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    /// Fire-and-forget. Returns whether the message was queued; a missing or
    /// saturated listener drops it.
    pub fn notify(&self, target: ContextId, message: Message) -> bool {
        let kind = message.kind();
        let Some(route) = self.hub.route(target) else {
            tracing::debug!(%kind, %target, "no listener, notification dropped");
            return false;
        };
        let envelope = Envelope {
            from: self.me,
            message,
            reply: None,
        };
        match route.try_send(envelope) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(%kind, %target, %error, "notification dropped");
                false
            }
        }
    }

    /// PING `target` until it answers, within the retry budget.
    pub async fn wait_until_ready(
        &self,
        target: ContextId,
        policy: RetryPolicy,
    ) -> Result<(), BusError> {
        let attempts = policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self
                .request_with_timeout(target, Message::Ping, policy.attempt_timeout)
                .await
            {
                Ok(response) if response.success => return Ok(()),
                Ok(_) => tracing::debug!(%target, attempt, "ping rejected"),
                Err(error) => tracing::debug!(%target, attempt, %error, "ping failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(policy.backoff).await;
            }
        }
        Err(BusError::NotReady {
            target: target.to_string(),
            attempts,
        })
    }
}
