//! [`DataStore`] over Postgres.
//!
//! Rows travel as JSONB so any table can be read and written without a
//! per-table model:
//!
//! - select: `row_to_json(t)` over rows where `field::text = $1`
//! - insert: one statement expanding a JSONB array with
//!   `jsonb_populate_recordset`, so a batch lands atomically
//! - delete: rows where `field::text = $1`
//!
//! Collection and field names are validated and double-quoted, which keeps
//! mixed-case columns such as `saminarId` intact.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dealerdesk_core::archive::{
    is_identifier, ArchiveCoordinator, ArchiveError, ArchiveJobDescriptor, ArchiveReport,
    ArchiveStep,
};
use dealerdesk_core::store::{DataStore, Filter, StoreError};
use dealerdesk_core::types::{RecordId, Row};
use serde_json::Value;
use sqlx::postgres::PgExecutor;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Shared SQL
// ---------------------------------------------------------------------------

/// Validate and double-quote a table or column name.
fn quote_ident(name: &str) -> Result<String, StoreError> {
    if is_identifier(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

fn map_sqlx_error(collection: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Rejected {
            collection: collection.to_string(),
            message: db_err.to_string(),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => StoreError::Connection(err.to_string()),
        other => StoreError::Query {
            collection: collection.to_string(),
            message: other.to_string(),
        },
    }
}

async fn select_rows<'e, E>(
    executor: E,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<Row>, StoreError>
where
    E: PgExecutor<'e>,
{
    let table = quote_ident(collection)?;
    let field = quote_ident(&filter.field)?;
    let Some(value) = filter.value_text() else {
        return Ok(Vec::new());
    };

    let sql = format!("SELECT row_to_json(t)::jsonb FROM {table} t WHERE t.{field}::text = $1");
    let values: Vec<Value> = sqlx::query_scalar(&sql)
        .bind(value)
        .fetch_all(executor)
        .await
        .map_err(|e| map_sqlx_error(collection, e))?;

    values
        .into_iter()
        .map(|v| match v {
            Value::Object(row) => Ok(row),
            other => Err(StoreError::Query {
                collection: collection.to_string(),
                message: format!("expected a JSON object row, got {other}"),
            }),
        })
        .collect()
}

async fn insert_rows<'e, E>(executor: E, collection: &str, rows: Vec<Row>) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    if rows.is_empty() {
        return Ok(());
    }
    let table = quote_ident(collection)?;

    // Union of keys: a key missing from one row inserts NULL for that row.
    let keys: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    let columns = keys
        .into_iter()
        .map(quote_ident)
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");

    let sql = format!(
        "INSERT INTO {table} ({columns}) \
         SELECT {columns} FROM jsonb_populate_recordset(NULL::{table}, $1)"
    );
    let batch = Value::Array(rows.into_iter().map(Value::Object).collect());
    sqlx::query(&sql)
        .bind(batch)
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error(collection, e))?;
    Ok(())
}

async fn delete_rows<'e, E>(executor: E, collection: &str, filter: &Filter) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    let table = quote_ident(collection)?;
    let field = quote_ident(&filter.field)?;
    let Some(value) = filter.value_text() else {
        return Ok(());
    };

    let sql = format!("DELETE FROM {table} WHERE {field}::text = $1");
    let result = sqlx::query(&sql)
        .bind(value)
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error(collection, e))?;
    tracing::debug!(collection, deleted = result.rows_affected(), "Rows deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Pool-backed store
// ---------------------------------------------------------------------------

/// Runs every call as its own statement on the pool. No cross-call atomicity.
#[derive(Clone)]
pub struct PgDataStore {
    pool: PgPool,
}

impl PgDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataStore for PgDataStore {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        select_rows(&self.pool, collection, filter).await
    }

    async fn insert(&self, collection: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        insert_rows(&self.pool, collection, rows).await
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), StoreError> {
        delete_rows(&self.pool, collection, filter).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Transaction-backed store
// ---------------------------------------------------------------------------

/// Runs every call on one open transaction. Nothing is visible to other
/// connections until [`commit`](Self::commit).
pub struct PgTransactionStore {
    tx: Mutex<Transaction<'static, Postgres>>,
}

impl PgTransactionStore {
    pub async fn begin(pool: &PgPool) -> Result<Self, StoreError> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { tx: Mutex::new(tx) })
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .into_inner()
            .commit()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .into_inner()
            .rollback()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl DataStore for PgTransactionStore {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let mut tx = self.tx.lock().await;
        select_rows(&mut **tx, collection, filter).await
    }

    async fn insert(&self, collection: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        insert_rows(&mut **tx, collection, rows).await
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), StoreError> {
        let mut tx = self.tx.lock().await;
        delete_rows(&mut **tx, collection, filter).await
    }
}

/// Archive `primary_id` inside a single transaction.
///
/// Commits on success and rolls back on any failure, so the caller never
/// sees partial state. A purge failure is therefore reported as
/// [`ArchiveError::ArchiveWriteFailed`]: after the rollback nothing changed.
pub async fn archive_atomically(
    pool: &PgPool,
    primary_id: &RecordId,
    job: &ArchiveJobDescriptor,
) -> Result<ArchiveReport, ArchiveError> {
    let tx_failed = |source| ArchiveError::ArchiveWriteFailed {
        step: ArchiveStep::Transaction,
        collection: job.primary.live_collection.clone(),
        source,
    };

    let store = PgTransactionStore::begin(pool).await.map_err(tx_failed)?;
    let outcome = ArchiveCoordinator::new(&store).archive(primary_id, job).await;

    match outcome {
        Ok(report) => {
            store.commit().await.map_err(tx_failed)?;
            Ok(report)
        }
        Err(err) => {
            if let Err(e) = store.rollback().await {
                tracing::warn!(error = %e, job = %job.name, "Archive rollback failed");
            }
            Err(match err {
                ArchiveError::PurgeFailed {
                    step,
                    collection,
                    source,
                } => ArchiveError::ArchiveWriteFailed {
                    step,
                    collection,
                    source,
                },
                other => other,
            })
        }
    }
}
