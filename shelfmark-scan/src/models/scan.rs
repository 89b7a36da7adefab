//! Scan run types: the audit trail of each library scan
//!
//! A scan run progresses `running -> completed | failed` and is never
//! revisited after reaching a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered the scan. All three traverse identically; the type is
/// recorded for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Full,
    Incremental,
    Manual,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Full => "full",
            ScanType::Incremental => "incremental",
            ScanType::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(ScanType::Full),
            "incremental" => Some(ScanType::Incremental),
            "manual" => Some(ScanType::Manual),
            _ => None,
        }
    }
}

/// Terminal and non-terminal run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanRunStatus {
    Running,
    Completed,
    Failed,
}

impl ScanRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanRunStatus::Running => "running",
            ScanRunStatus::Completed => "completed",
            ScanRunStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(ScanRunStatus::Running),
            "completed" => Some(ScanRunStatus::Completed),
            "failed" => Some(ScanRunStatus::Failed),
            _ => None,
        }
    }
}

/// One recorded per-item (or per-author-directory) failure. A run can
/// complete successfully while carrying a non-empty error list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanItemError {
    pub path: String,
    pub error: String,
}

/// Aggregate result of one traversal, serialized into the audit row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub books_found: u64,
    pub books_added: u64,
    pub books_updated: u64,
    /// Always 0: removal detection is deliberately not performed.
    pub books_removed: u64,
    pub errors: Vec<ScanItemError>,
}

/// In-memory scan state exposed to status polling. No database access is
/// needed to produce it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScanStatus {
    pub is_scanning: bool,
    pub current_scan_id: Option<i64>,
}

/// Persisted scan_history row.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRun {
    pub id: i64,
    pub scan_type: ScanType,
    pub status: ScanRunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub books_found: i64,
    pub books_added: i64,
    pub books_updated: i64,
    pub books_removed: i64,
    pub error_message: Option<String>,
    pub scan_results: Option<ScanSummary>,
}
