//! Handlers for the `/archive` resource.
//!
//! Operators pick a named job and a primary record id. The handlers preview
//! what would move, run the archive-and-purge, and read back archived copies.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use dealerdesk_core::archive::{
    ArchiveCoordinator, ArchiveError, ArchiveJobDescriptor, ArchivePreview, ArchiveReport,
    ArchivedRecordSet,
};
use dealerdesk_core::error::CoreError;
use dealerdesk_core::notify::archive_notification;
use dealerdesk_core::store::DataStore;
use dealerdesk_core::types::RecordId;
use dealerdesk_db::DbPool;
use dealerdesk_events::NotificationEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/archive/jobs
///
/// List every registered archive job.
pub async fn list_jobs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ArchiveJobDescriptor>>>> {
    let jobs = state.registry.jobs().cloned().collect();
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/archive/{job}/{id}/preview
///
/// Count the rows an archive would move. Writes nothing.
pub async fn preview(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((job_name, id)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<ArchivePreview>>> {
    let job = find_job(&state, &job_name)?;
    let preview = ArchiveCoordinator::new(state.store.as_ref())
        .preview(&RecordId::new(id), job)
        .await?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /api/v1/archive/{job}/{id}
///
/// Archive the record and its dependents, then purge the live rows.
///
/// The run is detached from the request: a timeout or client disconnect
/// does not stop it between steps, and its notification is still published.
pub async fn archive(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((job_name, id)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<ArchiveReport>>> {
    let job = find_job(&state, &job_name)?.clone();
    let primary_id = RecordId::new(id);

    tracing::info!(
        job = %job.name,
        primary_id = %primary_id,
        user_id = %admin.user_id,
        atomic = state.atomic_pool.is_some(),
        "Archive requested",
    );

    let store = Arc::clone(&state.store);
    let atomic_pool = state.atomic_pool.clone();
    let notifications = Arc::clone(&state.notifications);
    let task = tokio::spawn(async move {
        let outcome = run_archive(store.as_ref(), atomic_pool.as_ref(), &primary_id, &job).await;
        notifications.publish(
            NotificationEvent::new(archive_notification(&outcome))
                .with_source(format!("archive.{}", job.name))
                .with_actor(admin.user_id),
        );
        outcome
    });

    let report = task
        .await
        .map_err(|e| AppError::InternalError(format!("Archive task failed: {e}")))??;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/archive/{job}/{id}
///
/// Read the archived copies of a record and its dependents.
pub async fn find_archived(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((job_name, id)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<ArchivedRecordSet>>> {
    let job = find_job(&state, &job_name)?;
    let archived = ArchiveCoordinator::new(state.store.as_ref())
        .find_archived(&RecordId::new(id), job)
        .await?;
    Ok(Json(DataResponse { data: archived }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_job<'a>(state: &'a AppState, name: &str) -> AppResult<&'a ArchiveJobDescriptor> {
    state.registry.get(name).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "ArchiveJob",
            id: name.to_string(),
        })
    })
}

async fn run_archive(
    store: &dyn DataStore,
    atomic_pool: Option<&DbPool>,
    primary_id: &RecordId,
    job: &ArchiveJobDescriptor,
) -> Result<ArchiveReport, ArchiveError> {
    match atomic_pool {
        Some(pool) => dealerdesk_db::archive_atomically(pool, primary_id, job).await,
        None => ArchiveCoordinator::new(store).archive(primary_id, job).await,
    }
}
