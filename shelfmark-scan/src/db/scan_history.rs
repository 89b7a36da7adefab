//! Scan run audit trail
//!
//! One row per scan. The row is inserted as `running` before traversal and
//! updated to exactly one terminal status afterwards.

use crate::models::scan::{ScanRun, ScanRunStatus, ScanSummary, ScanType};
use chrono::{DateTime, Utc};
use shelfmark_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::warn;

/// Insert a new run in `running` state and return its id.
pub async fn insert_running(
    pool: &SqlitePool,
    scan_type: ScanType,
    started_at: DateTime<Utc>,
) -> Result<i64> {
    let id = sqlx::query(
        "INSERT INTO scan_history (scan_type, status, started_at) VALUES (?, 'running', ?)",
    )
    .bind(scan_type.as_str())
    .bind(started_at.to_rfc3339())
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Mark a run completed with its aggregate counts and serialized results
/// payload (error list included, which may be non-empty).
pub async fn mark_completed(
    pool: &SqlitePool,
    scan_id: i64,
    summary: &ScanSummary,
    completed_at: DateTime<Utc>,
) -> Result<()> {
    let results = serde_json::to_string(summary)
        .map_err(|e| Error::Internal(format!("Failed to serialize scan results: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE scan_history SET
            status = 'completed',
            completed_at = ?,
            books_found = ?,
            books_added = ?,
            books_updated = ?,
            books_removed = ?,
            scan_results = ?
        WHERE id = ?
        "#,
    )
    .bind(completed_at.to_rfc3339())
    .bind(summary.books_found as i64)
    .bind(summary.books_added as i64)
    .bind(summary.books_updated as i64)
    .bind(summary.books_removed as i64)
    .bind(results)
    .bind(scan_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a run failed with its error message.
pub async fn mark_failed(
    pool: &SqlitePool,
    scan_id: i64,
    message: &str,
    completed_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE scan_history SET
            status = 'failed',
            completed_at = ?,
            error_message = ?
        WHERE id = ?
        "#,
    )
    .bind(completed_at.to_rfc3339())
    .bind(message)
    .bind(scan_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent run, newest first by start time.
pub async fn latest_run(pool: &SqlitePool) -> Result<Option<ScanRun>> {
    let row = sqlx::query(
        "SELECT * FROM scan_history ORDER BY started_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| run_from_row(&row)).transpose()
}

/// Load a run by id.
pub async fn get_run(pool: &SqlitePool, scan_id: i64) -> Result<Option<ScanRun>> {
    let row = sqlx::query("SELECT * FROM scan_history WHERE id = ?")
        .bind(scan_id)
        .fetch_optional(pool)
        .await?;

    row.map(|row| run_from_row(&row)).transpose()
}

/// Paged run history, newest first.
pub async fn list_runs(pool: &SqlitePool, limit: i64, offset: i64) -> Result<(Vec<ScanRun>, i64)> {
    let rows = sqlx::query(
        "SELECT * FROM scan_history ORDER BY started_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let runs = rows
        .iter()
        .map(run_from_row)
        .collect::<Result<Vec<_>>>()?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_history")
        .fetch_one(pool)
        .await?;

    Ok((runs, total))
}

fn run_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScanRun> {
    let scan_type: String = row.get("scan_type");
    let scan_type = ScanType::parse(&scan_type)
        .ok_or_else(|| Error::Internal(format!("Unknown scan type: {}", scan_type)))?;

    let status: String = row.get("status");
    let status = ScanRunStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown scan status: {}", status)))?;

    let started_at: String = row.get("started_at");
    let started_at = DateTime::parse_from_rfc3339(&started_at)
        .map_err(|e| Error::Internal(format!("Failed to parse started_at: {}", e)))?
        .with_timezone(&Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse completed_at: {}", e)))?
        .map(|dt| dt.with_timezone(&Utc));

    // A results payload that fails to parse is reported but does not make
    // the whole run unreadable.
    let scan_results: Option<String> = row.get("scan_results");
    let scan_results = scan_results.and_then(|s| match serde_json::from_str(&s) {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!(error = %e, "Unreadable scan_results payload");
            None
        }
    });

    Ok(ScanRun {
        id: row.get("id"),
        scan_type,
        status,
        started_at,
        completed_at,
        books_found: row.get("books_found"),
        books_added: row.get("books_added"),
        books_updated: row.get("books_updated"),
        books_removed: row.get("books_removed"),
        error_message: row.get("error_message"),
        scan_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::ScanItemError;
    use sqlx::sqlite::SqlitePoolOptions;

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

    #[tokio::test]
    async fn run_lifecycle_completed() {
        let pool = test_pool().await;
        let id = insert_running(&pool, ScanType::Manual, Utc::now())
            .await
            .unwrap();

        let run = get_run(&pool, id).await.unwrap().unwrap();
        assert_eq!(run.status, ScanRunStatus::Running);
        assert!(run.completed_at.is_none());

        let mut summary = ScanSummary::default();
        summary.books_found = 3;
        summary.books_added = 2;
        summary.books_updated = 1;
        summary.errors.push(ScanItemError {
            path: "/lib/A/bad".into(),
            error: "boom".into(),
        });
        mark_completed(&pool, id, &summary, Utc::now()).await.unwrap();

        let run = get_run(&pool, id).await.unwrap().unwrap();
        assert_eq!(run.status, ScanRunStatus::Completed);
        assert_eq!(run.books_found, 3);
        assert_eq!(run.books_added, 2);
        assert!(run.completed_at.is_some());
        let results = run.scan_results.unwrap();
        assert_eq!(results.errors.len(), 1);
    }

    #[tokio::test]
    async fn run_lifecycle_failed() {
        let pool = test_pool().await;
        let id = insert_running(&pool, ScanType::Full, Utc::now())
            .await
            .unwrap();
        mark_failed(&pool, id, "library root vanished", Utc::now())
            .await
            .unwrap();

        let run = get_run(&pool, id).await.unwrap().unwrap();
        assert_eq!(run.status, ScanRunStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("library root vanished"));
        assert!(run.completed_at.is_some());
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let pool = test_pool().await;
        let first = insert_running(&pool, ScanType::Manual, Utc::now())
            .await
            .unwrap();
        mark_completed(&pool, first, &ScanSummary::default(), Utc::now())
            .await
            .unwrap();
        let second = insert_running(&pool, ScanType::Manual, Utc::now())
            .await
            .unwrap();

        let (runs, total) = list_runs(&pool, 20, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[1].id, first);

        let latest = latest_run(&pool).await.unwrap().unwrap();
        assert_eq!(latest.id, second);
    }
}
