//! Data store contract.
//!
//! [`DataStore`] is the only way the archive workflow touches persistence:
//! per-collection select, insert, and delete with a single equality filter.
//! The store offers no cross-collection transaction; callers that need
//! ordering guarantees sequence their own calls.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{canonical_text, RecordId, Row};

pub use memory::{MemoryStore, StoreCall};

/// Errors reported by a [`DataStore`] implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The query against `collection` failed.
    #[error("Query on {collection} failed: {message}")]
    Query { collection: String, message: String },

    /// The store could not be reached.
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A collection or field name is not a safe identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The store refused the operation (constraint, permission, injected fault).
    #[error("Operation on {collection} rejected: {message}")]
    Rejected { collection: String, message: String },
}

/// The three operations of the store contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Delete,
}

impl StoreOp {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::Select => "select",
            StoreOp::Insert => "insert",
            StoreOp::Delete => "delete",
        }
    }
}

/// Equality filter on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Filter matching `field` against a caller-supplied record id.
    pub fn by_id(field: impl Into<String>, id: &RecordId) -> Self {
        Self::eq(field, id.as_str())
    }

    /// Canonical text of the filter value, `None` for `null`.
    pub fn value_text(&self) -> Option<String> {
        canonical_text(&self.value)
    }

    /// Whether `row` satisfies this filter.
    ///
    /// Values are compared by canonical text so a string id matches an
    /// integer column holding the same number.
    pub fn matches(&self, row: &Row) -> bool {
        let Some(expected) = self.value_text() else {
            return false;
        };
        row.get(&self.field)
            .and_then(canonical_text)
            .is_some_and(|actual| actual == expected)
    }
}

/// Authenticated multi-collection store reachable over a network API.
///
/// - `select` returns every row matching the filter.
/// - `insert` appends all rows or none; an empty batch succeeds.
/// - `delete` removes every matching row and succeeds when nothing matches.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>, StoreError>;

    async fn insert(&self, collection: &str, rows: Vec<Row>) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), StoreError>;

    /// Cheap reachability check used by `GET /health`.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
