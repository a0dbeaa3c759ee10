//! Sequential archive-then-purge over a [`DataStore`].
//!
//! Ordering for [`ArchiveCoordinator::archive`]:
//!
//! 1. read the primary (missing → `NotFound`, nothing written)
//! 2. insert the stamped primary into its archive collection
//! 3. per dependent, in declared order: read, then bulk-insert stamped copies
//! 4. per dependent, in declared order: delete live rows
//! 5. delete the live primary
//!
//! Every call is awaited before the next is issued. The first failure stops
//! the sequence; failures before step 4 are `ArchiveWriteFailed`, later ones
//! `PurgeFailed`.

use chrono::Utc;

use super::{
    stamp_archived, ArchiveError, ArchiveJobDescriptor, ArchivePreview, ArchiveReport,
    ArchiveStep, ArchivedDependents, ArchivedRecordSet, DependentCount, DependentReport,
};
use crate::store::{DataStore, Filter, StoreError};
use crate::types::{RecordId, Row};

/// Runs archive jobs against a borrowed store.
pub struct ArchiveCoordinator<'a, S: DataStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DataStore + ?Sized> ArchiveCoordinator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Archive `primary_id` and its dependents, then purge the live rows.
    pub async fn archive(
        &self,
        primary_id: &RecordId,
        job: &ArchiveJobDescriptor,
    ) -> Result<ArchiveReport, ArchiveError> {
        job.check()?;

        let result = self.run_archive(primary_id, job).await;
        match &result {
            Ok(report) => tracing::info!(
                job = %job.name,
                primary_id = %primary_id,
                archived = report.total_archived(),
                "Archive completed"
            ),
            Err(ArchiveError::NotFound { .. }) => tracing::info!(
                job = %job.name,
                primary_id = %primary_id,
                "Archive skipped, primary record not found"
            ),
            Err(e) => tracing::warn!(
                job = %job.name,
                primary_id = %primary_id,
                step = ?e.step(),
                retry_safe = e.is_retry_safe(),
                error = %e,
                "Archive aborted"
            ),
        }
        result
    }

    async fn run_archive(
        &self,
        primary_id: &RecordId,
        job: &ArchiveJobDescriptor,
    ) -> Result<ArchiveReport, ArchiveError> {
        let primary = &job.primary;
        let primary_filter = Filter::by_id(&primary.key_field, primary_id);

        // -- 1. read primary --
        let record = self.read_primary(primary_id, job).await?;

        // -- 2. archive primary --
        let archived_at = Utc::now();
        self.store
            .insert(
                &primary.archive_collection,
                vec![stamp_archived(&record, archived_at)],
            )
            .await
            .map_err(|e| write_failed(ArchiveStep::ArchivePrimary, &primary.archive_collection, e))?;
        tracing::debug!(collection = %primary.archive_collection, "Primary archived");

        // -- 3. archive dependents --
        let mut dependents = Vec::with_capacity(job.dependents.len());
        for dep in &job.dependents {
            let filter = Filter::by_id(&dep.foreign_key_field, primary_id);
            let rows = self
                .store
                .select(&dep.collection, &filter)
                .await
                .map_err(|e| write_failed(ArchiveStep::ReadDependents, &dep.collection, e))?;

            if !rows.is_empty() {
                let stamped: Vec<Row> = rows
                    .iter()
                    .map(|row| stamp_archived(row, archived_at))
                    .collect();
                self.store
                    .insert(&dep.archive_collection, stamped)
                    .await
                    .map_err(|e| {
                        write_failed(ArchiveStep::ArchiveDependents, &dep.archive_collection, e)
                    })?;
            }
            tracing::debug!(
                collection = %dep.collection,
                archived = rows.len(),
                "Dependents archived"
            );

            dependents.push(DependentReport {
                collection: dep.collection.clone(),
                archive_collection: dep.archive_collection.clone(),
                archived: rows.len(),
            });
        }

        // -- 4. purge dependents --
        for dep in &job.dependents {
            let filter = Filter::by_id(&dep.foreign_key_field, primary_id);
            self.store
                .delete(&dep.collection, &filter)
                .await
                .map_err(|e| purge_failed(ArchiveStep::PurgeDependents, &dep.collection, e))?;
            tracing::debug!(collection = %dep.collection, "Dependents purged");
        }

        // -- 5. purge primary --
        self.store
            .delete(&primary.live_collection, &primary_filter)
            .await
            .map_err(|e| purge_failed(ArchiveStep::PurgePrimary, &primary.live_collection, e))?;

        Ok(ArchiveReport {
            job: job.name.clone(),
            primary_id: primary_id.clone(),
            primary_collection: primary.live_collection.clone(),
            archive_collection: primary.archive_collection.clone(),
            archived_at,
            dependents,
        })
    }

    /// Count what [`archive`](Self::archive) would move, without writing.
    pub async fn preview(
        &self,
        primary_id: &RecordId,
        job: &ArchiveJobDescriptor,
    ) -> Result<ArchivePreview, ArchiveError> {
        job.check()?;
        let primary = self.read_primary(primary_id, job).await?;

        let mut dependents = Vec::with_capacity(job.dependents.len());
        let mut total_count = 1;
        for dep in &job.dependents {
            let filter = Filter::by_id(&dep.foreign_key_field, primary_id);
            let count = self
                .store
                .select(&dep.collection, &filter)
                .await
                .map_err(|e| write_failed(ArchiveStep::ReadDependents, &dep.collection, e))?
                .len();
            total_count += count;
            dependents.push(DependentCount {
                collection: dep.collection.clone(),
                count,
            });
        }

        Ok(ArchivePreview {
            job: job.name.clone(),
            primary_id: primary_id.clone(),
            primary,
            dependents,
            total_count,
        })
    }

    /// Look up the archived copies of `primary_id` and its dependents.
    ///
    /// A primary archived more than once yields several copies.
    pub async fn find_archived(
        &self,
        primary_id: &RecordId,
        job: &ArchiveJobDescriptor,
    ) -> Result<ArchivedRecordSet, ArchiveError> {
        job.check()?;
        let target = &job.primary;

        let primary = self
            .store
            .select(
                &target.archive_collection,
                &Filter::by_id(&target.key_field, primary_id),
            )
            .await
            .map_err(|e| write_failed(ArchiveStep::ReadPrimary, &target.archive_collection, e))?;
        if primary.is_empty() {
            return Err(ArchiveError::NotFound {
                collection: target.archive_collection.clone(),
                id: primary_id.clone(),
            });
        }

        let mut dependents = Vec::with_capacity(job.dependents.len());
        for dep in &job.dependents {
            let rows = self
                .store
                .select(
                    &dep.archive_collection,
                    &Filter::by_id(&dep.foreign_key_field, primary_id),
                )
                .await
                .map_err(|e| {
                    write_failed(ArchiveStep::ReadDependents, &dep.archive_collection, e)
                })?;
            dependents.push(ArchivedDependents {
                collection: dep.archive_collection.clone(),
                rows,
            });
        }

        Ok(ArchivedRecordSet {
            job: job.name.clone(),
            primary_id: primary_id.clone(),
            primary,
            dependents,
        })
    }

    async fn read_primary(
        &self,
        primary_id: &RecordId,
        job: &ArchiveJobDescriptor,
    ) -> Result<Row, ArchiveError> {
        let target = &job.primary;
        let rows = self
            .store
            .select(
                &target.live_collection,
                &Filter::by_id(&target.key_field, primary_id),
            )
            .await
            .map_err(|e| write_failed(ArchiveStep::ReadPrimary, &target.live_collection, e))?;

        rows.into_iter().next().ok_or_else(|| ArchiveError::NotFound {
            collection: target.live_collection.clone(),
            id: primary_id.clone(),
        })
    }
}

fn write_failed(step: ArchiveStep, collection: &str, source: StoreError) -> ArchiveError {
    ArchiveError::ArchiveWriteFailed {
        step,
        collection: collection.to_string(),
        source,
    }
}

fn purge_failed(step: ArchiveStep, collection: &str, source: StoreError) -> ArchiveError {
    ArchiveError::PurgeFailed {
        step,
        collection: collection.to_string(),
        source,
    }
}
