//! HTTP-level integration tests for the `/archive` endpoints.
//!
//! Tests cover RBAC enforcement, preview, the archive-and-purge run with
//! its notification, failure status mapping, and reading archived copies.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{admin_token, body_json, get, get_auth, post_auth, seminar_store, token_for};
use dealerdesk_core::notify::Severity;
use dealerdesk_core::store::{DataStore, Filter, MemoryStore, StoreError, StoreOp};
use dealerdesk_core::types::Row;
use dealerdesk_events::NotificationBus;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Delegates to a [`MemoryStore`], pausing before deletes on one collection.
struct SlowPurgeStore {
    inner: Arc<MemoryStore>,
    collection: &'static str,
    delay: Duration,
}

#[async_trait]
impl DataStore for SlowPurgeStore {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        self.inner.select(collection, filter).await
    }

    async fn insert(&self, collection: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        self.inner.insert(collection, rows).await
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), StoreError> {
        if collection == self.collection {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.delete(collection, filter).await
    }
}

/// Panics on every read.
struct PanickingStore;

#[async_trait]
impl DataStore for PanickingStore {
    async fn select(&self, collection: &str, _filter: &Filter) -> Result<Vec<Row>, StoreError> {
        panic!("select on {collection} exploded");
    }

    async fn insert(&self, _collection: &str, _rows: Vec<Row>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _collection: &str, _filter: &Filter) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = common::build_test_app(seminar_store().await, Arc::default());
    let response = get(app, "/api/v1/archive/jobs").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let app = common::build_test_app(seminar_store().await, Arc::default());
    let response = get_auth(app, "/api/v1/archive/jobs", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_role_is_forbidden() {
    let store = seminar_store().await;
    let app = common::build_test_app(Arc::clone(&store), Arc::default());

    let response = post_auth(app, "/api/v1/archive/seminar/sem-1", &token_for("salesrep")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
    assert!(store.calls().await.is_empty(), "no store access before auth");
}

#[tokio::test]
async fn test_superadmin_is_allowed() {
    let app = common::build_test_app(seminar_store().await, Arc::default());
    let response = get_auth(app, "/api/v1/archive/jobs", &token_for("superadmin")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Jobs and preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_jobs_includes_seminar() {
    let app = common::build_test_app(seminar_store().await, Arc::default());
    let response = get_auth(app, "/api/v1/archive/jobs", &admin_token()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let jobs = json["data"].as_array().unwrap();
    let seminar = jobs.iter().find(|j| j["name"] == "seminar").unwrap();
    assert_eq!(seminar["primary"]["live_collection"], "seminars");
    assert_eq!(seminar["dependents"][1]["foreign_key_field"], "saminarId");
}

#[tokio::test]
async fn test_preview_counts_without_writing() {
    let store = seminar_store().await;
    let app = common::build_test_app(Arc::clone(&store), Arc::default());

    let response = get_auth(app, "/api/v1/archive/seminar/sem-1/preview", &admin_token()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = &body_json(response).await["data"];
    assert_eq!(data["primary"]["title"], "Spring Finance");
    assert_eq!(data["dependents"][0]["collection"], "seminar_signup");
    assert_eq!(data["dependents"][0]["count"], 2);
    assert_eq!(data["dependents"][1]["count"], 1);
    assert_eq!(data["total_count"], 4);

    assert!(store
        .calls()
        .await
        .iter()
        .all(|c| c.op == StoreOp::Select));
}

#[tokio::test]
async fn test_unknown_job_returns_404() {
    let app = common::build_test_app(seminar_store().await, Arc::default());
    let response = post_auth(app, "/api/v1/archive/vehicles/sem-1", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "ArchiveJob with id vehicles not found");
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_archive_moves_rows_and_notifies() {
    let store = seminar_store().await;
    let bus = Arc::new(NotificationBus::default());
    let mut rx = bus.subscribe();
    let app = common::build_test_app(Arc::clone(&store), Arc::clone(&bus));

    let response = post_auth(app, "/api/v1/archive/seminar/sem-1", &admin_token()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = &body_json(response).await["data"];
    assert_eq!(data["job"], "seminar");
    assert_eq!(data["primary_id"], "sem-1");
    assert_eq!(data["dependents"][0]["archived"], 2);
    assert_eq!(data["dependents"][1]["archived"], 1);

    let seminars = store.rows("seminars").await;
    assert_eq!(seminars.len(), 1);
    assert_eq!(seminars[0]["id"], "sem-2");
    assert_eq!(store.rows("seminar_signup").await.len(), 1);
    assert!(store.rows("seminar_registration").await.is_empty());

    let archived = store.rows("archived_seminars").await;
    assert_eq!(archived.len(), 1);
    assert!(archived[0]["archived_at"].is_string());
    assert_eq!(store.rows("archived_seminar_signup").await.len(), 2);
    assert_eq!(store.rows("archived_seminar_registration").await.len(), 1);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.notification.title, "Success");
    assert_eq!(event.notification.description, "Item successfully archived.");
    assert_eq!(event.source.as_deref(), Some("archive.seminar"));
    assert_eq!(event.actor.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn test_archive_missing_record_returns_404_and_warns() {
    let store = seminar_store().await;
    let bus = Arc::new(NotificationBus::default());
    let mut rx = bus.subscribe();
    let app = common::build_test_app(Arc::clone(&store), Arc::clone(&bus));

    let response = post_auth(app, "/api/v1/archive/seminar/ghost", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    assert!(store.rows("archived_seminars").await.is_empty());

    let event = rx.recv().await.unwrap();
    assert_eq!(event.notification.severity, Severity::Warning);
}

#[tokio::test]
async fn test_archive_write_failure_returns_502_and_keeps_live_rows() {
    let store = seminar_store().await;
    store.fail_on(StoreOp::Insert, "archived_seminar_signup").await;
    let app = common::build_test_app(Arc::clone(&store), Arc::default());

    let response = post_auth(app, "/api/v1/archive/seminar/sem-1", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "ARCHIVE_WRITE_FAILED");
    assert!(!json["error"].as_str().unwrap().contains("injected"));

    assert_eq!(store.rows("seminars").await.len(), 2);
    assert_eq!(store.rows("seminar_signup").await.len(), 3);
}

#[tokio::test]
async fn test_purge_failure_returns_500_with_reconciliation_hint() {
    let store = seminar_store().await;
    store.fail_on(StoreOp::Delete, "seminars").await;
    let bus = Arc::new(NotificationBus::default());
    let mut rx = bus.subscribe();
    let app = common::build_test_app(Arc::clone(&store), Arc::clone(&bus));

    let response = post_auth(app, "/api/v1/archive/seminar/sem-1", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PURGE_FAILED");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("seminars"), "{message}");
    assert!(message.contains("reconciliation"), "{message}");

    // Dependents are gone, the primary is both live and archived.
    assert!(store.rows("seminar_registration").await.is_empty());
    assert_eq!(store.rows("seminars").await.len(), 2);
    assert_eq!(store.rows("archived_seminars").await.len(), 1);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.notification.severity, Severity::Error);
}

#[tokio::test]
async fn test_find_archived_after_archive() {
    let store = seminar_store().await;
    let app = common::build_test_app(Arc::clone(&store), Arc::default());
    let token = admin_token();

    let response = post_auth(app.clone(), "/api/v1/archive/seminar/sem-1", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(app, "/api/v1/archive/seminar/sem-1", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = &body_json(response).await["data"];
    assert_eq!(data["primary"].as_array().unwrap().len(), 1);
    assert_eq!(data["primary"][0]["title"], "Spring Finance");
    assert_eq!(data["dependents"][0]["collection"], "archived_seminar_signup");
    assert_eq!(data["dependents"][0]["rows"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_archive_completes_after_request_timeout() {
    let store = seminar_store().await;
    let slow = Arc::new(SlowPurgeStore {
        inner: Arc::clone(&store),
        collection: "seminar_registration",
        delay: Duration::from_secs(2),
    });
    let bus = Arc::new(NotificationBus::default());
    let mut rx = bus.subscribe();
    let mut config = common::test_config();
    config.archive_timeout_secs = 1;
    let app = common::build_test_app_with(slow, Arc::clone(&bus), config);

    let response = post_auth(app, "/api/v1/archive/seminar/sem-1", &admin_token()).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body_json(response).await["code"], "REQUEST_TIMEOUT");

    // The run keeps going after the response and reports exactly once.
    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("archive should finish and notify")
        .unwrap();
    assert_eq!(event.notification.title, "Success");

    let seminars = store.rows("seminars").await;
    assert_eq!(seminars.len(), 1);
    assert_eq!(seminars[0]["id"], "sem-2");
    assert_eq!(store.rows("seminar_signup").await.len(), 1);
    assert!(store.rows("seminar_registration").await.is_empty());
    assert_eq!(store.rows("archived_seminars").await.len(), 1);
    assert_eq!(store.rows("archived_seminar_registration").await.len(), 1);
    assert!(rx.try_recv().is_err(), "one notification per attempt");
}

#[tokio::test]
async fn test_panicked_archive_returns_500() {
    let app = common::build_test_app_with(
        Arc::new(PanickingStore),
        Arc::default(),
        common::test_config(),
    );

    let response = post_auth(app, "/api/v1/archive/seminar/sem-1", &admin_token()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
