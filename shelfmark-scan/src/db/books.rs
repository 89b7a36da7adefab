//! Book persistence and reconciliation queries
//!
//! Creation of a new book is one transaction spanning author find-or-create,
//! the book row, and genre find-or-create plus join rows: either the whole
//! item lands in the catalog or none of it does. Updates are a single
//! untransacted statement and never touch genre links (see `update_book`).

use crate::models::book::{Book, BookDetail, BookRecord, BookSummary};
use shelfmark_common::Result;
use sqlx::{Row, SqlitePool};

/// Look up a book by its deterministic external key.
pub async fn find_by_external_id(pool: &SqlitePool, external_id: &str) -> Result<Option<Book>> {
    let row = sqlx::query(
        "SELECT id, external_id, title, author_id FROM books WHERE external_id = ?",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Book {
        id: row.get("id"),
        external_id: row.get("external_id"),
        title: row.get("title"),
        author_id: row.get("author_id"),
    }))
}

/// Insert a newly discovered book.
///
/// Author and genres are created lazily by name; the first observed
/// spelling becomes canonical. All rows commit together or roll back
/// together.
pub async fn insert_book(pool: &SqlitePool, record: &BookRecord) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let author_id: i64 = match sqlx::query_scalar("SELECT id FROM authors WHERE name = ?")
        .bind(&record.author_name)
        .fetch_optional(&mut *tx)
        .await?
    {
        Some(id) => id,
        None => sqlx::query("INSERT INTO authors (name) VALUES (?)")
            .bind(&record.author_name)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid(),
    };

    let book_id = sqlx::query(
        r#"
        INSERT INTO books (
            external_id, title, subtitle, author_id, description, isbn, asin,
            language, publisher, published_date, duration_seconds, format,
            cover_image_path, file_path, is_series, series_name,
            series_sequence, last_scanned
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.external_id)
    .bind(&record.title)
    .bind(&record.subtitle)
    .bind(author_id)
    .bind(&record.description)
    .bind(&record.isbn)
    .bind(&record.asin)
    .bind(&record.language)
    .bind(&record.publisher)
    .bind(record.published_date.map(|d| d.to_string()))
    .bind(record.duration_seconds)
    .bind(&record.format)
    .bind(&record.cover_image_path)
    .bind(&record.file_path)
    .bind(record.is_series)
    .bind(&record.series_name)
    .bind(record.series_sequence)
    .bind(record.last_scanned.to_rfc3339())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for genre_name in &record.genres {
        let genre_id: i64 = match sqlx::query_scalar("SELECT id FROM genres WHERE name = ?")
            .bind(genre_name)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(id) => id,
            None => sqlx::query("INSERT INTO genres (name) VALUES (?)")
                .bind(genre_name)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid(),
        };

        sqlx::query("INSERT INTO book_genres (book_id, genre_id) VALUES (?, ?)")
            .bind(book_id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(book_id)
}

/// Update an already-cataloged book from a fresh scan record.
///
/// Single untransacted statement, asymmetric with creation. Identity
/// columns (external_id, author_id) and genre links are not modified: a
/// changed sidecar genre list does not re-sync book_genres.
pub async fn update_book(pool: &SqlitePool, book_id: i64, record: &BookRecord) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE books SET
            title = ?, subtitle = ?, description = ?, isbn = ?, asin = ?,
            language = ?, publisher = ?, published_date = ?,
            duration_seconds = ?, format = ?, cover_image_path = ?,
            file_path = ?, is_series = ?, series_name = ?,
            series_sequence = ?, last_scanned = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&record.title)
    .bind(&record.subtitle)
    .bind(&record.description)
    .bind(&record.isbn)
    .bind(&record.asin)
    .bind(&record.language)
    .bind(&record.publisher)
    .bind(record.published_date.map(|d| d.to_string()))
    .bind(record.duration_seconds)
    .bind(&record.format)
    .bind(&record.cover_image_path)
    .bind(&record.file_path)
    .bind(record.is_series)
    .bind(&record.series_name)
    .bind(record.series_sequence)
    .bind(record.last_scanned.to_rfc3339())
    .bind(book_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Paginated catalog listing joined with author names. `search` matches
/// title, author name, or description.
pub async fn list_books(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
    search: Option<&str>,
) -> Result<(Vec<BookSummary>, i64)> {
    let pattern = search.map(|s| format!("%{}%", s));

    let (rows, total) = match &pattern {
        Some(pattern) => {
            let rows = sqlx::query(
                r#"
                SELECT books.id, books.title, books.subtitle, authors.name AS author_name,
                       books.format, books.duration_seconds, books.language,
                       books.cover_image_path, books.is_series, books.series_name,
                       books.series_sequence, books.published_date, books.last_scanned
                FROM books
                JOIN authors ON authors.id = books.author_id
                WHERE books.title LIKE ?1 OR authors.name LIKE ?1 OR books.description LIKE ?1
                ORDER BY books.title COLLATE NOCASE ASC
                LIMIT ?2 OFFSET ?3
                "#,
            )
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

            let total: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM books
                JOIN authors ON authors.id = books.author_id
                WHERE books.title LIKE ?1 OR authors.name LIKE ?1 OR books.description LIKE ?1
                "#,
            )
            .bind(pattern)
            .fetch_one(pool)
            .await?;

            (rows, total)
        }
        None => {
            let rows = sqlx::query(
                r#"
                SELECT books.id, books.title, books.subtitle, authors.name AS author_name,
                       books.format, books.duration_seconds, books.language,
                       books.cover_image_path, books.is_series, books.series_name,
                       books.series_sequence, books.published_date, books.last_scanned
                FROM books
                JOIN authors ON authors.id = books.author_id
                ORDER BY books.title COLLATE NOCASE ASC
                LIMIT ?1 OFFSET ?2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
                .fetch_one(pool)
                .await?;

            (rows, total)
        }
    };

    let books = rows.into_iter().map(|row| summary_from_row(&row)).collect();

    Ok((books, total))
}

/// Single book with author and genre names.
pub async fn get_book(pool: &SqlitePool, book_id: i64) -> Result<Option<BookDetail>> {
    let row = sqlx::query(
        r#"
        SELECT books.id, books.title, books.subtitle, authors.name AS author_name,
               books.format, books.duration_seconds, books.language,
               books.cover_image_path, books.is_series, books.series_name,
               books.series_sequence, books.published_date, books.last_scanned,
               books.external_id, books.description, books.isbn, books.asin,
               books.publisher, books.file_path
        FROM books
        JOIN authors ON authors.id = books.author_id
        WHERE books.id = ?
        "#,
    )
    .bind(book_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let genres: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT genres.name
        FROM book_genres
        JOIN genres ON genres.id = book_genres.genre_id
        WHERE book_genres.book_id = ?
        ORDER BY genres.name
        "#,
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(BookDetail {
        summary: summary_from_row(&row),
        external_id: row.get("external_id"),
        description: row.get("description"),
        isbn: row.get("isbn"),
        asin: row.get("asin"),
        publisher: row.get("publisher"),
        file_path: row.get("file_path"),
        genres,
    }))
}

fn summary_from_row(row: &sqlx::sqlite::SqliteRow) -> BookSummary {
    BookSummary {
        id: row.get("id"),
        title: row.get("title"),
        subtitle: row.get("subtitle"),
        author_name: row.get("author_name"),
        format: row.get("format"),
        duration_seconds: row.get("duration_seconds"),
        language: row.get("language"),
        cover_image_path: row.get("cover_image_path"),
        is_series: row.get("is_series"),
        series_name: row.get("series_name"),
        series_sequence: row.get("series_sequence"),
        published_date: row.get("published_date"),
        last_scanned: row.get("last_scanned"),
    }
}
