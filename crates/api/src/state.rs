use std::sync::Arc;

use dealerdesk_core::archive::registry::ArchiveRegistry;
use dealerdesk_core::store::DataStore;
use dealerdesk_events::NotificationBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Live and archive collections.
    pub store: Arc<dyn DataStore>,
    /// Set when archives run inside one database transaction.
    pub atomic_pool: Option<dealerdesk_db::DbPool>,
    /// Named archive jobs.
    pub registry: Arc<ArchiveRegistry>,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Operator notifications for archive outcomes.
    pub notifications: Arc<NotificationBus>,
}
