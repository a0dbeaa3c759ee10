//! Postgres persistence for DealerDesk.
//!
//! - [`create_pool`], [`health_check`], [`run_migrations`] -- pool lifecycle.
//! - [`store`] -- [`DataStore`](dealerdesk_core::store::DataStore)
//!   implementations over `sqlx`, including single-transaction archiving.

pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use store::{archive_atomically, PgDataStore, PgTransactionStore};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
