//! Cross-context message protocol.
//!
//! Three kinds of context talk over this bus: the coordinator, one observer
//! per page, and the panel. Requests are futures resolved through a one-shot
//! reply slot; notifications are best-effort and never answered.

mod hub;
mod message;
mod transport;

pub use hub::{ContextId, Hub, MAILBOX_CAPACITY};
pub use message::{BadgePayload, Message, MessageType, Response};
pub use transport::{BusClient, Envelope, Mailbox, Responder, RetryPolicy};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use std::time::Duration;

    fn spawn_echo(mut mailbox: Mailbox) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = mailbox.recv().await {
                match envelope.message {
                    Message::Ping => envelope.respond(Response::ok()),
                    _ => envelope.respond(Response::failure("unsupported")),
                }
            }
        })
    }

    #[tokio::test]
    async fn request_resolves_with_response() {
        let hub = Hub::new();
        let handle = spawn_echo(hub.register(ContextId::Page(1)));
        let client = BusClient::new(ContextId::Panel, hub);

        let response = client
            .request(ContextId::Page(1), Message::Ping)
            .await
            .unwrap();
        assert!(response.success);
        handle.abort();
    }

    #[tokio::test]
    async fn concurrent_requests_resolve_independently() {
        let hub = Hub::new();
        let mut mailbox = hub.register(ContextId::Background);
        let client = BusClient::new(ContextId::Panel, hub);

        // Answer in reverse arrival order.
        let server = tokio::spawn(async move {
            let first = mailbox.recv().await.unwrap();
            let second = mailbox.recv().await.unwrap();
            second.respond(Response::failure("second"));
            first.respond(Response::failure("first"));
        });

        let (a, b) = tokio::join!(
            client.request(ContextId::Background, Message::GetSettings),
            async {
                tokio::task::yield_now().await;
                client.request(ContextId::Background, Message::GetAdStatus).await
            }
        );
        assert_eq!(a.unwrap().error.as_deref(), Some("first"));
        assert_eq!(b.unwrap().error.as_deref(), Some("second"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn request_to_unregistered_context_is_disconnected() {
        let client = BusClient::new(ContextId::Panel, Hub::new());
        let err = client
            .request(ContextId::Page(9), Message::Ping)
            .await
            .unwrap_err();
        assert_eq!(err, BusError::Disconnected("page:9".into()));
    }

    #[tokio::test]
    async fn dropped_responder_surfaces_no_response() {
        let hub = Hub::new();
        let mut mailbox = hub.register(ContextId::Background);
        let client = BusClient::new(ContextId::Panel, hub);

        let server = tokio::spawn(async move {
            let envelope = mailbox.recv().await.unwrap();
            drop(envelope);
            mailbox
        });
        let err = client
            .request(ContextId::Background, Message::GetSettings)
            .await
            .unwrap_err();
        assert_eq!(err, BusError::NoResponse("background".into()));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn notify_without_listener_is_dropped_silently() {
        let client = BusClient::new(ContextId::Page(1), Hub::new());
        assert!(!client.notify(
            ContextId::Background,
            Message::UpdateBadge(BadgePayload { speed: None })
        ));
    }

    #[tokio::test]
    async fn notify_delivers_without_reply_slot() {
        let hub = Hub::new();
        let mut mailbox = hub.register(ContextId::Background);
        let client = BusClient::new(ContextId::Page(4), hub);

        assert!(client.notify(
            ContextId::Background,
            Message::UpdateBadge(BadgePayload { speed: Some(16.0) })
        ));
        let envelope = mailbox.recv().await.unwrap();
        assert_eq!(envelope.from, ContextId::Page(4));
        assert!(envelope.reply.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_probe_gives_up_after_budget() {
        let hub = Hub::new();
        // Registered but never answering: the observer has not attached its
        // handler yet.
        let _silent = hub.register(ContextId::Page(1));
        let client = BusClient::new(ContextId::Panel, hub);

        let err = client
            .wait_until_ready(ContextId::Page(1), RetryPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BusError::NotReady {
                target: "page:1".into(),
                attempts: 3,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_probe_succeeds_once_handler_attaches() {
        let hub = Hub::new();
        let client = BusClient::new(ContextId::Panel, hub.clone());

        let late = tokio::spawn({
            let hub = hub.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(700)).await;
                spawn_echo(hub.register(ContextId::Page(1))).await.ok();
            }
        });

        client
            .wait_until_ready(ContextId::Page(1), RetryPolicy::default())
            .await
            .unwrap();
        late.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn request_with_timeout_bounds_wait() {
        let hub = Hub::new();
        let _silent = hub.register(ContextId::Background);
        let client = BusClient::new(ContextId::Panel, hub);

        let err = client
            .request_with_timeout(
                ContextId::Background,
                Message::GetSettings,
                Duration::from_millis(250),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BusError::Timeout {
                target: "background".into(),
                millis: 250,
            }
        );
    }
}
