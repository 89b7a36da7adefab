//! Per-title metadata extraction
//!
//! Reads one book directory, classifies its files, merges the optional
//! `metadata.json` sidecar with directory-name fallbacks, and produces a
//! normalized [`BookRecord`]. Pure with respect to the database: the only
//! inputs are the directory contents at call time.

use crate::models::book::{BookRecord, SidecarMetadata};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{NaiveDate, Utc};
use shelfmark_common::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sidecar file name (one per book directory, optional).
const SIDECAR_FILE: &str = "metadata.json";

/// Audio format detection order. The first extension present wins.
const FORMAT_PRECEDENCE: [&str; 4] = ["m4b", "mp3", "m4a", "flac"];

pub struct MetadataExtractor {
    library_root: PathBuf,
}

impl MetadataExtractor {
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
        }
    }

    /// Extract a normalized record from one book directory.
    ///
    /// Returns `Ok(None)` when the directory holds no audio files (not an
    /// error; the directory is simply not a book).
    pub fn scan_book_directory(
        &self,
        book_path: &Path,
        author_dir: &str,
        book_dir: &str,
    ) -> Result<Option<BookRecord>> {
        // Sorted so format and cover selection are deterministic across
        // filesystems.
        let mut file_names = Vec::new();
        for entry in std::fs::read_dir(book_path)? {
            let entry = entry?;
            file_names.push(entry.file_name().to_string_lossy().into_owned());
        }
        file_names.sort();

        let metadata = self.read_sidecar(book_path, &file_names);

        let audio_files: Vec<&String> =
            file_names.iter().filter(|f| is_audio_file(f)).collect();
        let cover_files: Vec<&String> =
            file_names.iter().filter(|f| is_cover_file(f)).collect();
        let ebook_files: Vec<String> = file_names
            .iter()
            .filter(|f| is_ebook_file(f))
            .cloned()
            .collect();

        if audio_files.is_empty() {
            debug!(path = %book_path.display(), "No audio files found, skipping directory");
            return Ok(None);
        }

        let published_date = metadata
            .published_year
            .as_ref()
            .and_then(|y| y.as_i64())
            .and_then(|y| i32::try_from(y).ok())
            .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));

        let series_name = metadata.series.clone();

        let record = BookRecord {
            external_id: self.external_id(book_path),
            title: metadata.title.clone().unwrap_or_else(|| book_dir.to_string()),
            subtitle: metadata.subtitle.clone(),
            author_name: metadata
                .author
                .clone()
                .unwrap_or_else(|| author_dir.to_string()),
            description: metadata.description.clone().or_else(|| metadata.summary.clone()),
            isbn: metadata.isbn.clone(),
            asin: metadata.asin.clone(),
            language: metadata.language.clone().unwrap_or_else(|| "en".to_string()),
            publisher: metadata.publisher.clone(),
            published_date,
            duration_seconds: metadata.duration.map(|d| d.round() as i64).unwrap_or(0),
            format: detect_format(&audio_files).to_string(),
            cover_image_path: cover_files
                .first()
                .map(|f| book_path.join(f).to_string_lossy().into_owned()),
            file_path: book_path.to_string_lossy().into_owned(),
            is_series: series_name.is_some(),
            series_name,
            series_sequence: metadata.sequence.as_ref().and_then(|s| s.as_i64()),
            genres: metadata.genres.clone(),
            ebook_files,
            last_scanned: Utc::now(),
        };

        Ok(Some(record))
    }

    /// Deterministic external key: base64 of the path relative to the
    /// library root. Re-scanning an unchanged directory always yields the
    /// same key; moving the directory yields a new one.
    fn external_id(&self, book_path: &Path) -> String {
        let relative = book_path
            .strip_prefix(&self.library_root)
            .unwrap_or(book_path);
        BASE64.encode(relative.to_string_lossy().as_bytes())
    }

    /// Parse the sidecar if present. A sidecar that cannot be read or
    /// parsed downgrades to a warning; the item is still extracted from
    /// directory names.
    fn read_sidecar(&self, book_path: &Path, file_names: &[String]) -> SidecarMetadata {
        if !file_names.iter().any(|f| f == SIDECAR_FILE) {
            return SidecarMetadata::default();
        }
        let sidecar_path = book_path.join(SIDECAR_FILE);
        let content = match std::fs::read_to_string(&sidecar_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %sidecar_path.display(), error = %e, "Failed to read metadata.json");
                return SidecarMetadata::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %sidecar_path.display(), error = %e, "Failed to parse metadata.json");
                SidecarMetadata::default()
            }
        }
    }
}

fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

fn is_audio_file(name: &str) -> bool {
    matches!(
        file_extension(name).as_deref(),
        Some("m4b" | "mp3" | "m4a" | "aac" | "ogg" | "flac")
    )
}

fn is_cover_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    let Some((stem, ext)) = lower.rsplit_once('.') else {
        return false;
    };
    matches!(stem, "cover" | "folder") && matches!(ext, "jpg" | "jpeg" | "png" | "webp")
}

fn is_ebook_file(name: &str) -> bool {
    matches!(
        file_extension(name).as_deref(),
        Some("epub" | "pdf" | "mobi" | "azw3")
    )
}

fn detect_format(audio_files: &[&String]) -> &'static str {
    for format in FORMAT_PRECEDENCE {
        if audio_files
            .iter()
            .any(|f| file_extension(f).as_deref() == Some(format))
        {
            return format;
        }
    }
    "unknown"
}
