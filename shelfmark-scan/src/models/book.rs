//! Book records produced by metadata extraction
//!
//! `SidecarMetadata` mirrors the optional `metadata.json` document that may
//! sit next to a book's audio files; `BookRecord` is the normalized result
//! of extraction, ready for reconciliation against the catalog.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Sidecar `metadata.json` document. Every field is optional; extraction
/// falls back to directory names for anything missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SidecarMetadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub isbn: Option<String>,
    pub asin: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<NumberOrString>,
    pub duration: Option<f64>,
    pub series: Option<String>,
    pub sequence: Option<NumberOrString>,
    pub genres: Vec<String>,
}

/// Sidecar values that appear as either a JSON number or a quoted string
/// in the wild (`"publishedYear": 1951` vs `"publishedYear": "1951"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(i64),
    Text(String),
}

impl NumberOrString {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Normalized book data extracted from one title directory.
///
/// Pure value type: building one touches only the filesystem, never the
/// database.
#[derive(Debug, Clone, Serialize)]
pub struct BookRecord {
    /// Deterministic key derived from the directory path relative to the
    /// library root. Stable across metadata edits, changes on moves.
    pub external_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_name: String,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub asin: Option<String>,
    pub language: String,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub duration_seconds: i64,
    pub format: String,
    pub cover_image_path: Option<String>,
    pub file_path: String,
    pub is_series: bool,
    pub series_name: Option<String>,
    pub series_sequence: Option<i64>,
    pub genres: Vec<String>,
    /// Ebook files found alongside the audio (recorded, not cataloged)
    pub ebook_files: Vec<String>,
    pub last_scanned: DateTime<Utc>,
}

/// Catalog row subset used by the reconciler to decide insert vs update.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub author_id: i64,
}

/// Book row joined with its author name, for catalog listings.
#[derive(Debug, Clone, Serialize)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_name: String,
    pub format: Option<String>,
    pub duration_seconds: Option<i64>,
    pub language: Option<String>,
    pub cover_image_path: Option<String>,
    pub is_series: bool,
    pub series_name: Option<String>,
    pub series_sequence: Option<i64>,
    pub published_date: Option<String>,
    pub last_scanned: Option<String>,
}

/// Full book detail including genre names.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub summary: BookSummary,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub asin: Option<String>,
    pub publisher: Option<String>,
    pub file_path: Option<String>,
    pub genres: Vec<String>,
}
