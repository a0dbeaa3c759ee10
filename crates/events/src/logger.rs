//! Structured-log consumer for the notification bus.
//!
//! [`NotificationLogger`] subscribes to the [`NotificationBus`](crate::bus::NotificationBus)
//! and writes every notification as a `tracing` event whose level follows
//! the notification severity. It shuts down when the bus is dropped.

use dealerdesk_core::notify::Severity;
use tokio::sync::broadcast;

use crate::bus::NotificationEvent;

/// Background service that logs operator notifications.
pub struct NotificationLogger;

impl NotificationLogger {
    /// Run the logging loop until the channel closes.
    ///
    /// Returns the number of notifications logged.
    pub async fn run(mut receiver: broadcast::Receiver<NotificationEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::log(&event);
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Notification bus closed, logger shutting down");
                    break;
                }
            }
        }
        logged
    }

    fn log(event: &NotificationEvent) {
        let n = &event.notification;
        let source = event.source.as_deref().unwrap_or("-");
        let actor = event.actor.as_deref().unwrap_or("-");
        match n.severity {
            Severity::Error => tracing::error!(
                title = %n.title, description = %n.description, source, actor,
                "Operator notification"
            ),
            Severity::Warning => tracing::warn!(
                title = %n.title, description = %n.description, source, actor,
                "Operator notification"
            ),
            Severity::Info | Severity::Success => tracing::info!(
                title = %n.title, description = %n.description, source, actor,
                "Operator notification"
            ),
        }
    }
}
