//! Catalog read API
//!
//! GET /api/books, GET /api/books/:id

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::books;
use crate::error::{ApiError, ApiResult};
use crate::models::book::{BookDetail, BookSummary};
use crate::AppState;

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/api/books", get(list_books))
        .route("/api/books/:id", get(get_book))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookListResponse {
    pub books: Vec<BookSummary>,
    pub pagination: ListPagination,
}

#[derive(Debug, Serialize)]
pub struct ListPagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

/// GET /api/books
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<BookListResponse>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(24).clamp(1, 100);
    let offset = (page - 1) * limit;
    let search = params.search.as_deref().filter(|s| !s.trim().is_empty());

    let (books, total) = books::list_books(&state.db, limit, offset, search).await?;

    Ok(Json(BookListResponse {
        books,
        pagination: ListPagination {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        },
    }))
}

/// GET /api/books/:id
pub async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> ApiResult<Json<BookDetail>> {
    let book = books::get_book(&state.db, book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book not found: {}", book_id)))?;

    Ok(Json(book))
}
