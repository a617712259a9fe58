//! Fire-and-forget notifications for ticket and applicant state changes.
//!
//! Engines receive a [`NotificationSink`] at construction and call [`NotificationSink::emit`]
//! after a change has been committed. The production sink, [`ChannelNotifier`], only pushes
//! onto a bounded channel; a [`NotificationDispatcher`] task drains it into a
//! [`NotificationTransport`]. Nothing on the emitting side waits for delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Event published on a named channel (e.g. `service.4` or `ticket.17`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        channel: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
        emitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            channel: channel.into(),
            event: event.into(),
            payload,
            emitted_at,
        }
    }
}

/// Outbound hook handed to the engines. Implementations must return without blocking.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, notification: Notification);
}

/// Sink backed by a bounded channel. A full or closed channel drops the event.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelNotifier {
    fn emit(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    channel = %dropped.channel,
                    event = %dropped.event,
                    "notification channel full; dropping event"
                );
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(
                    channel = %dropped.channel,
                    event = %dropped.event,
                    "notification dispatcher stopped; dropping event"
                );
            }
        }
    }
}

/// Delivery error reported by a transport.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Final hop for a notification (websocket fan-out, push, e-mail, ...).
pub trait NotificationTransport: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Transport that writes every notification to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

impl NotificationTransport for LogTransport {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            channel = %notification.channel,
            event = %notification.event,
            payload = %notification.payload,
            "notification delivered"
        );
        Ok(())
    }
}

/// Background task draining the notification channel.
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Spawn the drain loop; it ends once every sender has been dropped.
    pub fn spawn<T>(mut rx: mpsc::Receiver<Notification>, transport: Arc<T>) -> JoinHandle<usize>
    where
        T: NotificationTransport,
    {
        tokio::spawn(async move {
            let mut delivered = 0usize;
            while let Some(notification) = rx.recv().await {
                match transport.deliver(&notification) {
                    Ok(()) => delivered += 1,
                    Err(err) => warn!(
                        channel = %notification.channel,
                        event = %notification.event,
                        error = %err,
                        "notification delivery failed"
                    ),
                }
            }
            debug!(delivered, "notification dispatcher stopped");
            delivered
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl NotificationTransport for RecordingTransport {
        fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
            if self.fail_on == Some(notification.event.as_str()) {
                return Err(DeliveryError::Transport("socket closed".to_string()));
            }
            self.seen
                .lock()
                .expect("transport mutex poisoned")
                .push(notification.event.clone());
            Ok(())
        }
    }

    fn notification(event: &str) -> Notification {
        Notification::new("service.1", event, json!({}), Utc::now())
    }

    #[test]
    fn full_channel_drops_without_blocking() {
        let (notifier, mut rx) = ChannelNotifier::new(1);
        notifier.emit(notification("ticket.created"));
        notifier.emit(notification("ticket.claimed"));

        let first = rx.try_recv().expect("first event buffered");
        assert_eq!(first.event, "ticket.created");
        assert!(rx.try_recv().is_err(), "second event should be dropped");
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (notifier, rx) = ChannelNotifier::new(4);
        drop(rx);
        notifier.emit(notification("ticket.created"));
    }

    #[tokio::test]
    async fn dispatcher_keeps_draining_after_delivery_failure() {
        let (notifier, rx) = ChannelNotifier::new(8);
        let transport = Arc::new(RecordingTransport {
            seen: Mutex::new(Vec::new()),
            fail_on: Some("ticket.claimed"),
        });
        let handle = NotificationDispatcher::spawn(rx, transport.clone());

        notifier.emit(notification("ticket.created"));
        notifier.emit(notification("ticket.claimed"));
        notifier.emit(notification("ticket.started"));
        drop(notifier);

        let delivered = handle.await.expect("dispatcher joins");
        assert_eq!(delivered, 2);
        assert_eq!(
            *transport.seen.lock().expect("transport mutex poisoned"),
            vec!["ticket.created".to_string(), "ticket.started".to_string()]
        );
    }
}
