use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dealerdesk_core::archive::registry::ArchiveRegistry;
use dealerdesk_core::store::{DataStore, MemoryStore};
use dealerdesk_db::{DbPool, PgDataStore};
use dealerdesk_events::{NotificationBus, NotificationLogger};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dealerdesk_api::config::{LogFormat, ServerConfig, StoreKind};
use dealerdesk_api::router::build_app_router;
use dealerdesk_api::state::AppState;

const DEFAULT_LOG_FILTER: &str = "dealerdesk_api=debug,dealerdesk_core=debug,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store,
        atomic = config.archive_atomic,
        "Loaded server configuration"
    );

    // --- Data store ---
    let (store, atomic_pool): (Arc<dyn DataStore>, Option<DbPool>) = match config.store {
        StoreKind::Postgres => {
            let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

            let pool = dealerdesk_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            dealerdesk_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            dealerdesk_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let atomic_pool = config.archive_atomic.then(|| pool.clone());
            (Arc::new(PgDataStore::new(pool)), atomic_pool)
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory data store; contents are lost on restart");
            if config.archive_atomic {
                tracing::warn!("ARCHIVE_ATOMIC is ignored by the in-memory data store");
            }
            (Arc::new(MemoryStore::new()), None)
        }
    };

    // --- Archive jobs ---
    let mut registry = ArchiveRegistry::builtin();
    if let Some(path) = &config.archive_jobs_path {
        registry
            .load_file(path)
            .expect("Failed to load archive job descriptors");
    }
    tracing::info!(jobs = registry.len(), "Archive registry ready");

    // --- Notification bus ---
    let notifications = Arc::new(NotificationBus::default());
    let logger_handle = tokio::spawn(NotificationLogger::run(notifications.subscribe()));

    // --- App state ---
    let state = AppState {
        store,
        atomic_pool,
        registry: Arc::new(registry),
        config: Arc::new(config.clone()),
        notifications: Arc::clone(&notifications),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Dropping the last sender closes the channel and stops the logger.
    drop(notifications);
    if let Ok(Ok(logged)) = tokio::time::timeout(Duration::from_secs(5), logger_handle).await {
        tracing::info!(logged, "Notification logger stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
