//! Route definitions for the `/archive` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::archive;
use crate::state::AppState;

/// Routes mounted at `/archive`.
///
/// ```text
/// GET    /jobs                 -> list_jobs
/// GET    /{job}/{id}/preview   -> preview
/// POST   /{job}/{id}           -> archive
/// GET    /{job}/{id}           -> find_archived
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(archive::list_jobs))
        .route("/{job}/{id}/preview", get(archive::preview))
        .route(
            "/{job}/{id}",
            get(archive::find_archived).post(archive::archive),
        )
}
