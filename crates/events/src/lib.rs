//! In-process delivery of operator notifications.
//!
//! - [`NotificationBus`] -- publish/subscribe hub backed by
//!   `tokio::sync::broadcast`; implements
//!   [`NotificationSink`](dealerdesk_core::notify::NotificationSink).
//! - [`NotificationEvent`] -- a notification stamped with its context.
//! - [`NotificationLogger`] -- background task writing every notification
//!   to the structured log.

pub mod bus;
pub mod logger;

pub use bus::{NotificationBus, NotificationEvent};
pub use logger::NotificationLogger;
