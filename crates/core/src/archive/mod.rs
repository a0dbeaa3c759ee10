//! Archive-and-purge domain logic.
//!
//! A primary record and every dependent row referencing it are copied into
//! parallel `archived_*` collections with an `archived_at` stamp, then the
//! live rows are deleted: dependents first, primary last.
//!
//! - [`ArchiveJobDescriptor`] -- which collections a job cascades through.
//! - [`coordinator::ArchiveCoordinator`] -- runs a job against a store.
//! - [`registry::ArchiveRegistry`] -- named jobs, built-in and file-loaded.

pub mod coordinator;
pub mod registry;

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::StoreError;
use crate::types::{RecordId, Row, Timestamp};

pub use coordinator::ArchiveCoordinator;
pub use registry::ArchiveRegistry;

/// Field added to every archived copy.
pub const ARCHIVED_AT_FIELD: &str = "archived_at";

/// Default key field of a primary collection.
pub const DEFAULT_KEY_FIELD: &str = "id";

/// Collection and field names: SQL identifiers up to the Postgres limit.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"));

/// Returns `true` if `name` is usable as a collection or field name.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

fn default_key_field() -> String {
    DEFAULT_KEY_FIELD.to_string()
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// The primary collection of a job and where its archived copy goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PrimaryTarget {
    #[validate(regex(path = *IDENTIFIER))]
    pub live_collection: String,
    #[validate(regex(path = *IDENTIFIER))]
    pub archive_collection: String,
    #[serde(default = "default_key_field")]
    #[validate(regex(path = *IDENTIFIER))]
    pub key_field: String,
}

/// One dependent collection cascaded by a job.
///
/// The foreign-key field is named per collection because dependents do not
/// agree on a spelling (`seminar_id` vs `saminarId`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DependentCascade {
    #[validate(regex(path = *IDENTIFIER))]
    pub collection: String,
    #[validate(regex(path = *IDENTIFIER))]
    pub foreign_key_field: String,
    #[validate(regex(path = *IDENTIFIER))]
    pub archive_collection: String,
}

impl DependentCascade {
    pub fn new(
        collection: impl Into<String>,
        foreign_key_field: impl Into<String>,
        archive_collection: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            foreign_key_field: foreign_key_field.into(),
            archive_collection: archive_collection.into(),
        }
    }
}

/// Declares, for one primary record type, the ordered dependents to cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ArchiveJobDescriptor {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(nested)]
    pub primary: PrimaryTarget,
    #[serde(default)]
    #[validate(nested)]
    pub dependents: Vec<DependentCascade>,
}

impl ArchiveJobDescriptor {
    /// Start a descriptor keyed by `id` with no dependents.
    pub fn new(
        name: impl Into<String>,
        live_collection: impl Into<String>,
        archive_collection: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            primary: PrimaryTarget {
                live_collection: live_collection.into(),
                archive_collection: archive_collection.into(),
                key_field: default_key_field(),
            },
            dependents: Vec::new(),
        }
    }

    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.primary.key_field = key_field.into();
        self
    }

    /// Append a dependent; cascade order is declaration order.
    pub fn with_dependent(mut self, dependent: DependentCascade) -> Self {
        self.dependents.push(dependent);
        self
    }

    /// Check names and collection wiring before any store call is made.
    pub fn check(&self) -> Result<(), ArchiveError> {
        self.validate()
            .map_err(|e| ArchiveError::InvalidDescriptor(format!("{}: {e}", self.name)))?;

        let invalid = |msg: String| Err(ArchiveError::InvalidDescriptor(msg));

        let mut live = HashSet::new();
        live.insert(self.primary.live_collection.as_str());
        for dep in &self.dependents {
            if dep.collection == self.primary.live_collection {
                return invalid(format!(
                    "{}: dependent {} is the primary collection",
                    self.name, dep.collection
                ));
            }
            if !live.insert(dep.collection.as_str()) {
                return invalid(format!(
                    "{}: dependent {} declared twice",
                    self.name, dep.collection
                ));
            }
        }

        // An archive collection that is also a live collection of this job
        // would be purged after the copy was written.
        let mut archives = HashSet::new();
        let targets = std::iter::once(&self.primary.archive_collection)
            .chain(self.dependents.iter().map(|d| &d.archive_collection));
        for archive in targets {
            if live.contains(archive.as_str()) {
                return invalid(format!(
                    "{}: archive collection {archive} must differ from every live collection",
                    self.name
                ));
            }
            if !archives.insert(archive.as_str()) {
                return invalid(format!(
                    "{}: archive collection {archive} is shared by two targets",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The step of the archive sequence an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStep {
    ReadPrimary,
    ArchivePrimary,
    ReadDependents,
    ArchiveDependents,
    PurgeDependents,
    PurgePrimary,
    /// Opening or committing a store transaction (atomic mode only).
    Transaction,
}

impl ArchiveStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchiveStep::ReadPrimary => "read_primary",
            ArchiveStep::ArchivePrimary => "archive_primary",
            ArchiveStep::ReadDependents => "read_dependents",
            ArchiveStep::ArchiveDependents => "archive_dependents",
            ArchiveStep::PurgeDependents => "purge_dependents",
            ArchiveStep::PurgePrimary => "purge_primary",
            ArchiveStep::Transaction => "transaction",
        }
    }
}

impl fmt::Display for ArchiveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The primary record does not exist. Nothing was written.
    #[error("{collection} record {id} not found")]
    NotFound { collection: String, id: RecordId },

    /// A read or archive insert failed before anything was deleted.
    #[error("Archive failed at {step} on {collection}: {source}")]
    ArchiveWriteFailed {
        step: ArchiveStep,
        collection: String,
        #[source]
        source: StoreError,
    },

    /// A delete failed after archive copies were written. Live and archived
    /// copies may now coexist and need reconciling.
    #[error("Purge failed at {step} on {collection}: {source}")]
    PurgeFailed {
        step: ArchiveStep,
        collection: String,
        #[source]
        source: StoreError,
    },

    #[error("Invalid archive job: {0}")]
    InvalidDescriptor(String),
}

impl ArchiveError {
    /// Whether the whole operation can be re-run from the start.
    ///
    /// After a purge failure a re-run writes a second archive copy.
    pub fn is_retry_safe(&self) -> bool {
        !matches!(self, ArchiveError::PurgeFailed { .. })
    }

    pub fn step(&self) -> Option<ArchiveStep> {
        match self {
            ArchiveError::ArchiveWriteFailed { step, .. }
            | ArchiveError::PurgeFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Rows archived from one dependent collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependentReport {
    pub collection: String,
    pub archive_collection: String,
    pub archived: usize,
}

/// Outcome of a successful archive.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub job: String,
    pub primary_id: RecordId,
    pub primary_collection: String,
    pub archive_collection: String,
    pub archived_at: Timestamp,
    pub dependents: Vec<DependentReport>,
}

impl ArchiveReport {
    /// Rows archived including the primary.
    pub fn total_archived(&self) -> usize {
        1 + self.dependents.iter().map(|d| d.archived).sum::<usize>()
    }
}

/// Dry-run counts for an archive.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivePreview {
    pub job: String,
    pub primary_id: RecordId,
    pub primary: Row,
    pub dependents: Vec<DependentCount>,
    pub total_count: usize,
}

/// Live dependent rows that an archive would move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependentCount {
    pub collection: String,
    pub count: usize,
}

/// Archived copies of a primary and its dependents.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedRecordSet {
    pub job: String,
    pub primary_id: RecordId,
    pub primary: Vec<Row>,
    pub dependents: Vec<ArchivedDependents>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchivedDependents {
    pub collection: String,
    pub rows: Vec<Row>,
}

// ---------------------------------------------------------------------------
// Stamping
// ---------------------------------------------------------------------------

/// Copy `row` with `archived_at` set to `at`. No field is dropped.
pub fn stamp_archived(row: &Row, at: Timestamp) -> Row {
    let mut copy = row.clone();
    copy.insert(
        ARCHIVED_AT_FIELD.to_string(),
        serde_json::Value::String(at.to_rfc3339()),
    );
    copy
}
