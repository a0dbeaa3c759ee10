//! In-memory [`DataStore`] with a call journal and fault injection.
//!
//! Collections are plain vectors of rows behind a `tokio::sync::Mutex`.
//! Every call is appended to a journal before it is evaluated so tests can
//! assert on call order, including calls that failed.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DataStore, Filter, StoreError, StoreOp};
use crate::types::Row;

/// One journaled store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub collection: String,
}

impl StoreCall {
    pub fn new(op: StoreOp, collection: impl Into<String>) -> Self {
        Self {
            op,
            collection: collection.into(),
        }
    }
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Row>>,
    calls: Vec<StoreCall>,
    faults: HashSet<(StoreOp, String)>,
}

/// Process-local store used by tests and the `memory` development backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a collection without journaling the call.
    pub async fn seed(&self, collection: &str, rows: impl IntoIterator<Item = Row>) {
        let mut inner = self.inner.lock().await;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
    }

    /// Current contents of a collection (empty if it was never written).
    pub async fn rows(&self, collection: &str) -> Vec<Row> {
        let inner = self.inner.lock().await;
        inner
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Make every `op` on `collection` fail until [`clear_faults`](Self::clear_faults).
    pub async fn fail_on(&self, op: StoreOp, collection: &str) {
        let mut inner = self.inner.lock().await;
        inner.faults.insert((op, collection.to_string()));
    }

    pub async fn clear_faults(&self) {
        self.inner.lock().await.faults.clear();
    }

    /// Journal the call and report an injected fault, if any.
    fn enter(inner: &mut Inner, op: StoreOp, collection: &str) -> Result<(), StoreError> {
        inner.calls.push(StoreCall::new(op, collection));
        if inner.faults.contains(&(op, collection.to_string())) {
            return Err(StoreError::Rejected {
                collection: collection.to_string(),
                message: format!("injected {} failure", op.as_str()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let mut inner = self.inner.lock().await;
        Self::enter(&mut inner, StoreOp::Select, collection)?;
        Ok(inner
            .collections
            .get(collection)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        Self::enter(&mut inner, StoreOp::Insert, collection)?;
        if !rows.is_empty() {
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .extend(rows);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        Self::enter(&mut inner, StoreOp::Delete, collection)?;
        if let Some(rows) = inner.collections.get_mut(collection) {
            rows.retain(|r| !filter.matches(r));
        }
        Ok(())
    }
}
