//! Notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`NotificationBus`] is shared via `Arc<NotificationBus>`. Publishing never
//! blocks and never fails; a bus with no subscribers drops the message.

use chrono::{DateTime, Utc};
use dealerdesk_core::notify::{Notification, NotificationSink};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// NotificationEvent
// ---------------------------------------------------------------------------

/// A notification as carried on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(flatten)]
    pub notification: Notification,

    /// Optional source, e.g. `"archive.seminar"`.
    pub source: Option<String>,

    /// Optional id of the user who triggered the action.
    pub actor: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(notification: Notification) -> Self {
        Self {
            notification,
            source: None,
            actor: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

// ---------------------------------------------------------------------------
// NotificationBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out bus for operator notifications.
///
/// ```rust
/// use dealerdesk_core::notify::{Notification, Severity};
/// use dealerdesk_events::{NotificationBus, NotificationEvent};
///
/// let bus = NotificationBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(NotificationEvent::new(Notification::new(
///     "Success",
///     "Item successfully archived.",
///     Severity::Success,
/// )));
/// ```
pub struct NotificationBus {
    sender: broadcast::Sender<NotificationEvent>,
}

impl NotificationBus {
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: NotificationEvent) {
        // A SendError only means there are no receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationSink for NotificationBus {
    fn notify(&self, notification: Notification) {
        self.publish(NotificationEvent::new(notification));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
