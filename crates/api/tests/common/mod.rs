#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use dealerdesk_api::auth::jwt::{generate_access_token, JwtConfig};
use dealerdesk_api::config::{LogFormat, ServerConfig, StoreKind};
use dealerdesk_api::router::build_app_router;
use dealerdesk_api::state::AppState;
use dealerdesk_core::archive::registry::ArchiveRegistry;
use dealerdesk_core::store::{DataStore, MemoryStore};
use dealerdesk_core::types::Row;
use dealerdesk_events::NotificationBus;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// 30-second read and 120-second archive timeouts, and the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        archive_timeout_secs: 120,
        store: StoreKind::Memory,
        archive_atomic: false,
        archive_jobs_path: None,
        log_format: LogFormat::Text,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router over `store` with the builtin jobs.
///
/// Uses the same [`build_app_router`] as `main.rs` so integration tests
/// exercise the production middleware stack.
pub fn build_test_app(store: Arc<MemoryStore>, notifications: Arc<NotificationBus>) -> Router {
    build_test_app_with(store, notifications, test_config())
}

/// Like [`build_test_app`] with any store and a custom config.
pub fn build_test_app_with(
    store: Arc<dyn DataStore>,
    notifications: Arc<NotificationBus>,
    config: ServerConfig,
) -> Router {
    let state = AppState {
        store,
        atomic_pool: None,
        registry: Arc::new(ArchiveRegistry::builtin()),
        config: Arc::new(config.clone()),
        notifications,
    };
    build_app_router(state, &config)
}

/// A signed access token for `role`.
pub fn token_for(role: &str) -> String {
    generate_access_token("user-1", role, &test_config().jwt)
        .expect("token generation should succeed")
}

pub fn admin_token() -> String {
    token_for("admin")
}

pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("row must be a JSON object")
}

/// Store with seminar `sem-1` (two signups, one registration) and an
/// unrelated seminar `sem-2`.
pub async fn seminar_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            "seminars",
            [
                row(json!({"id": "sem-1", "title": "Spring Finance", "seats": 30})),
                row(json!({"id": "sem-2", "title": "Summer Service", "seats": 12})),
            ],
        )
        .await;
    store
        .seed(
            "seminar_signup",
            [
                row(json!({"id": 1, "seminar_id": "sem-1", "full_name": "Ana"})),
                row(json!({"id": 2, "seminar_id": "sem-1", "full_name": "Ben"})),
                row(json!({"id": 3, "seminar_id": "sem-2", "full_name": "Cy"})),
            ],
        )
        .await;
    store
        .seed(
            "seminar_registration",
            [row(json!({"id": 7, "saminarId": "sem-1", "dealership": "North Motors"}))],
        )
        .await;
    store
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
