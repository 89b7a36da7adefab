//! Router-level API tests (no network; tower oneshot)

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use shelfmark_scan::services::LibraryScanner;
use shelfmark_scan::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    shelfmark_common::db::create_schema(&pool)
        .await
        .expect("Schema initialization failed");
    pool
}

async fn test_app(library: &TempDir) -> (SqlitePool, axum::Router) {
    let pool = test_pool().await;
    let scanner = Arc::new(LibraryScanner::new(pool.clone(), library.path()));
    let state = AppState::new(pool.clone(), scanner);
    (pool, shelfmark_scan::build_router(state))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy() {
    let library = TempDir::new().unwrap();
    let (_pool, app) = test_app(&library).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn scan_status_idle_with_no_history() {
    let library = TempDir::new().unwrap();
    let (_pool, app) = test_app(&library).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/library/scan/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["is_scanning"], false);
    assert!(json["latest_scan"].is_null());
}

#[tokio::test]
async fn validate_reflects_library_path() {
    let library = TempDir::new().unwrap();
    let (_pool, app) = test_app(&library).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/library/validate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["is_valid"], true);
}

#[tokio::test]
async fn start_scan_runs_in_background() {
    let library = TempDir::new().unwrap();
    let book = library.path().join("Asimov").join("Foundation");
    fs::create_dir_all(&book).unwrap();
    fs::write(book.join("foundation.m4b"), b"").unwrap();
    let (pool, app) = test_app(&library).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/library/scan")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"type": "manual"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "started");
    assert_eq!(json["scan_type"], "manual");

    // The scan is fire-and-forget; wait for the audit row to go terminal
    let mut completed = false;
    for _ in 0..50 {
        if let Some(run) = shelfmark_scan::db::scan_history::latest_run(&pool)
            .await
            .unwrap()
        {
            if run.completed_at.is_some() {
                assert_eq!(run.books_added, 1);
                completed = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(completed, "scan did not finish within the test window");
}

#[tokio::test]
async fn start_scan_rejects_missing_library() {
    let library = TempDir::new().unwrap();
    let (pool, _app) = test_app(&library).await;
    let scanner = Arc::new(LibraryScanner::new(
        pool.clone(),
        library.path().join("missing"),
    ));
    let app = shelfmark_scan::build_router(AppState::new(pool, scanner));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/library/scan")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"type": "full"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn books_list_is_empty_before_any_scan() {
    let library = TempDir::new().unwrap();
    let (_pool, app) = test_app(&library).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/books?page=1&limit=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["pagination"]["total"], 0);
    assert!(json["books"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_book_is_404() {
    let library = TempDir::new().unwrap();
    let (_pool, app) = test_app(&library).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/books/9999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}
