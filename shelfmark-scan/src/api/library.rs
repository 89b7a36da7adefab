//! Library scan API handlers
//!
//! POST /api/library/scan, GET /api/library/scan/status,
//! GET /api/library/scan/history, GET /api/library/validate,
//! GET /api/library/stats

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{scan_history, stats};
use crate::error::{ApiError, ApiResult};
use crate::models::scan::{ScanRun, ScanStatus, ScanType};
use crate::AppState;

pub fn library_routes() -> Router<AppState> {
    Router::new()
        .route("/api/library/scan", post(start_scan))
        .route("/api/library/scan/status", get(scan_status))
        .route("/api/library/scan/history", get(scan_run_history))
        .route("/api/library/validate", get(validate_library))
        .route("/api/library/stats", get(library_stats))
}

/// POST /api/library/scan request
#[derive(Debug, Default, Deserialize)]
pub struct StartScanRequest {
    #[serde(rename = "type")]
    pub scan_type: Option<ScanType>,
}

/// POST /api/library/scan response
#[derive(Debug, Serialize)]
pub struct StartScanResponse {
    pub scan_type: ScanType,
    pub status: &'static str,
}

/// POST /api/library/scan
///
/// Starts a scan as a fire-and-forget background task. The request does
/// not wait for traversal; progress is polled via the status endpoint.
pub async fn start_scan(
    State(state): State<AppState>,
    payload: Option<Json<StartScanRequest>>,
) -> ApiResult<Json<StartScanResponse>> {
    let scan_type = payload
        .map(|Json(request)| request.scan_type)
        .unwrap_or_default()
        .unwrap_or(ScanType::Manual);

    if !state.scanner.validate_library_path() {
        return Err(ApiError::BadRequest(
            "Library path is not accessible. Please check your configuration.".to_string(),
        ));
    }

    // Fast rejection; the scanner enforces single-flight authoritatively
    if state.scanner.status().is_scanning {
        return Err(ApiError::Conflict(
            "Library scan already in progress".to_string(),
        ));
    }

    let scanner = state.scanner.clone();
    tokio::spawn(async move {
        match scanner.start(scan_type).await {
            Ok(summary) => {
                tracing::info!(
                    books_found = summary.books_found,
                    books_added = summary.books_added,
                    books_updated = summary.books_updated,
                    "Scan completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Scan failed");
            }
        }
    });

    Ok(Json(StartScanResponse {
        scan_type,
        status: "started",
    }))
}

/// GET /api/library/scan/status response
#[derive(Debug, Serialize)]
pub struct ScanStatusResponse {
    #[serde(flatten)]
    pub status: ScanStatus,
    pub latest_scan: Option<ScanRun>,
}

/// GET /api/library/scan/status
pub async fn scan_status(State(state): State<AppState>) -> ApiResult<Json<ScanStatusResponse>> {
    let status = state.scanner.status();
    let latest_scan = scan_history::latest_run(&state.db).await?;

    Ok(Json(ScanStatusResponse {
        status,
        latest_scan,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct ScanHistoryResponse {
    pub scans: Vec<ScanRun>,
    pub pagination: Pagination,
}

/// GET /api/library/scan/history
pub async fn scan_run_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<ScanHistoryResponse>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let (scans, total) = scan_history::list_runs(&state.db, limit, offset).await?;

    Ok(Json(ScanHistoryResponse {
        scans,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        },
    }))
}

/// GET /api/library/validate response
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub is_valid: bool,
    pub path: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/library/validate
pub async fn validate_library(State(state): State<AppState>) -> Json<ValidateResponse> {
    let is_valid = state.scanner.validate_library_path();

    Json(ValidateResponse {
        is_valid,
        path: state.scanner.library_path().to_string_lossy().into_owned(),
        timestamp: Utc::now().to_rfc3339(),
        error: (!is_valid)
            .then(|| "Library path is not accessible or does not exist".to_string()),
    })
}

/// GET /api/library/stats
pub async fn library_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<stats::LibraryStats>> {
    let stats = stats::library_stats(&state.db).await?;
    Ok(Json(stats))
}
