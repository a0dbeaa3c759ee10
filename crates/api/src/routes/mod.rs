pub mod archive;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /archive/jobs                         list archive jobs (admin)
/// /archive/{job}/{id}/preview           dry-run counts (admin)
/// /archive/{job}/{id}                   archive (POST), archived copies (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/archive", archive::router())
}
