//! Database initialization and schema tests

use shelfmark_common::db::{create_schema, init_database};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    create_schema(&pool).await.expect("Schema creation failed");
    pool
}

async fn table_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn init_creates_database_file_and_tables() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("data").join("shelfmark.db");

    let pool = init_database(&db_path).await.unwrap();

    assert!(db_path.exists());
    let tables = table_names(&pool).await;
    for expected in [
        "authors",
        "book_genres",
        "books",
        "genres",
        "scan_history",
        "settings",
    ] {
        assert!(
            tables.iter().any(|t| t == expected),
            "missing table {}",
            expected
        );
    }
}

#[tokio::test]
async fn schema_creation_is_idempotent() {
    let pool = memory_pool().await;
    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();
}

#[tokio::test]
async fn author_names_are_unique() {
    let pool = memory_pool().await;

    sqlx::query("INSERT INTO authors (name) VALUES ('Asimov')")
        .execute(&pool)
        .await
        .unwrap();
    let duplicate = sqlx::query("INSERT INTO authors (name) VALUES ('Asimov')")
        .execute(&pool)
        .await;
    assert!(duplicate.is_err());

    // Case-sensitive uniqueness: a variant spelling is a distinct author
    sqlx::query("INSERT INTO authors (name) VALUES ('asimov')")
        .execute(&pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn book_genre_pairs_are_unique() {
    let pool = memory_pool().await;

    sqlx::query("INSERT INTO authors (name) VALUES ('Asimov')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO books (title, author_id, external_id) VALUES ('Foundation', 1, 'a2V5')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO genres (name) VALUES ('Sci-Fi')")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO book_genres (book_id, genre_id) VALUES (1, 1)")
        .execute(&pool)
        .await
        .unwrap();
    let duplicate = sqlx::query("INSERT INTO book_genres (book_id, genre_id) VALUES (1, 1)")
        .execute(&pool)
        .await;
    assert!(duplicate.is_err());
}

#[tokio::test]
async fn scan_history_rejects_unknown_status() {
    let pool = memory_pool().await;

    let bad_status = sqlx::query(
        "INSERT INTO scan_history (scan_type, status, started_at) VALUES ('manual', 'paused', '2026-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;
    assert!(bad_status.is_err());

    let bad_type = sqlx::query(
        "INSERT INTO scan_history (scan_type, status, started_at) VALUES ('hourly', 'running', '2026-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;
    assert!(bad_type.is_err());
}
