//! Library statistics queries

use serde::Serialize;
use shelfmark_common::Result;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, Serialize)]
pub struct LibraryCounts {
    pub books: i64,
    pub authors: i64,
    pub genres: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentBook {
    pub id: i64,
    pub title: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub counts: LibraryCounts,
    pub recently_added: Vec<RecentBook>,
    pub top_genres: Vec<GenreCount>,
}

pub async fn library_stats(pool: &SqlitePool) -> Result<LibraryStats> {
    let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(pool)
        .await?;
    let authors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
        .fetch_one(pool)
        .await?;
    let genres: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
        .fetch_one(pool)
        .await?;

    let recently_added = sqlx::query(
        "SELECT id, title, created_at FROM books ORDER BY created_at DESC, id DESC LIMIT 5",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| RecentBook {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
    })
    .collect();

    let top_genres = sqlx::query(
        r#"
        SELECT genres.name AS name, COUNT(book_genres.id) AS count
        FROM book_genres
        JOIN genres ON genres.id = book_genres.genre_id
        GROUP BY genres.id, genres.name
        ORDER BY count DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| GenreCount {
        name: row.get("name"),
        count: row.get("count"),
    })
    .collect();

    Ok(LibraryStats {
        counts: LibraryCounts {
            books,
            authors,
            genres,
        },
        recently_added,
        top_genres,
    })
}
