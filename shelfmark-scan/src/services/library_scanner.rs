//! Library scan coordination
//!
//! `LibraryScanner` owns the single-flight scan state and drives the
//! walker, extractor, and reconciliation over the whole tree. Exactly one
//! scan may run at a time process-wide; a second `start` is rejected
//! before any audit row is written.
//!
//! Error isolation is three-tiered: a failing title directory is recorded
//! and skipped, a failing author directory likewise, and only an error
//! that escapes the traversal itself (for example the library root
//! disappearing mid-run) marks the whole run failed.

use crate::db::{books, scan_history};
use crate::models::book::BookRecord;
use crate::models::scan::{ScanItemError, ScanStatus, ScanSummary, ScanType};
use crate::services::directory_walker;
use crate::services::metadata_extractor::MetadataExtractor;
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan is already running; the request is rejected, not queued
    #[error("Library scan already in progress")]
    AlreadyRunning,

    /// Traversal-level I/O failure (library root unreadable)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence failure outside item isolation (audit row writes)
    #[error(transparent)]
    Common(#[from] shelfmark_common::Error),
}

#[derive(Debug, Default)]
struct ScanState {
    scanning: bool,
    current_scan_id: Option<i64>,
}

/// Releases the single-flight state on every exit path, including panics
/// and early returns.
struct ScanGuard {
    state: Arc<Mutex<ScanState>>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        let mut state = lock_state(&self.state);
        state.scanning = false;
        state.current_scan_id = None;
    }
}

fn lock_state(state: &Mutex<ScanState>) -> std::sync::MutexGuard<'_, ScanState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scan coordinator service. Constructed once at startup with its
/// dependencies injected and shared by reference with the HTTP layer.
pub struct LibraryScanner {
    db: SqlitePool,
    library_path: PathBuf,
    extractor: MetadataExtractor,
    state: Arc<Mutex<ScanState>>,
}

impl LibraryScanner {
    pub fn new(db: SqlitePool, library_path: impl Into<PathBuf>) -> Self {
        let library_path = library_path.into();
        Self {
            db,
            extractor: MetadataExtractor::new(library_path.clone()),
            library_path,
            state: Arc::new(Mutex::new(ScanState::default())),
        }
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    /// Check that the configured library root exists and is a directory.
    pub fn validate_library_path(&self) -> bool {
        directory_walker::validate_library_path(&self.library_path)
    }

    /// Current in-memory scan state. No database access.
    pub fn status(&self) -> ScanStatus {
        let state = lock_state(&self.state);
        ScanStatus {
            is_scanning: state.scanning,
            current_scan_id: state.current_scan_id,
        }
    }

    /// Run a full library scan.
    ///
    /// Inserts the audit row, traverses the tree, reconciles every
    /// extracted record, and writes the terminal audit state. On a
    /// run-level failure the error is recorded and re-raised so a
    /// fire-and-forget caller can log it.
    pub async fn start(&self, scan_type: ScanType) -> Result<ScanSummary, ScanError> {
        let _guard = self.acquire()?;

        info!(scan_type = scan_type.as_str(), "Starting library scan");

        let scan_id = scan_history::insert_running(&self.db, scan_type, Utc::now()).await?;
        lock_state(&self.state).current_scan_id = Some(scan_id);

        match self.perform_scan().await {
            Ok(summary) => {
                if let Err(e) =
                    scan_history::mark_completed(&self.db, scan_id, &summary, Utc::now()).await
                {
                    error!(scan_id, error = %e, "Failed to record scan completion");
                    self.record_failure(scan_id, &e.to_string()).await;
                    return Err(e.into());
                }
                info!(
                    scan_id,
                    books_found = summary.books_found,
                    books_added = summary.books_added,
                    books_updated = summary.books_updated,
                    errors = summary.errors.len(),
                    "Library scan completed"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(scan_id, error = %e, "Library scan failed");
                self.record_failure(scan_id, &e.to_string()).await;
                Err(e)
            }
        }
        // _guard drops here, releasing the single-flight state
    }

    /// Best-effort terminal-state write; a failure here is logged, never
    /// propagated over the original scan error.
    async fn record_failure(&self, scan_id: i64, message: &str) {
        if let Err(db_err) =
            scan_history::mark_failed(&self.db, scan_id, message, Utc::now()).await
        {
            error!(scan_id, error = %db_err, "Failed to record scan failure");
        }
    }

    /// Atomic check-and-set of the single-flight flag.
    fn acquire(&self) -> Result<ScanGuard, ScanError> {
        let mut state = lock_state(&self.state);
        if state.scanning {
            return Err(ScanError::AlreadyRunning);
        }
        state.scanning = true;
        state.current_scan_id = None;
        drop(state);
        Ok(ScanGuard {
            state: Arc::clone(&self.state),
        })
    }

    /// Sequential two-level traversal: authors, then titles within each.
    async fn perform_scan(&self) -> Result<ScanSummary, ScanError> {
        let mut summary = ScanSummary::default();

        // A failure here (root unreadable) is run-level and propagates
        let author_dirs = directory_walker::list_child_directories(&self.library_path)?;

        for author_dir in author_dirs {
            let author_path = self.library_path.join(&author_dir);
            debug!(author = %author_dir, "Scanning author directory");

            let book_dirs = match directory_walker::list_child_directories(&author_path) {
                Ok(dirs) => dirs,
                Err(e) => {
                    warn!(path = %author_path.display(), error = %e, "Failed to scan author directory");
                    summary.errors.push(ScanItemError {
                        path: author_path.to_string_lossy().into_owned(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for book_dir in book_dirs {
                let book_path = author_path.join(&book_dir);
                if let Err(e) = self
                    .process_book_directory(&book_path, &author_dir, &book_dir, &mut summary)
                    .await
                {
                    warn!(path = %book_path.display(), error = %e, "Failed to scan book directory");
                    summary.errors.push(ScanItemError {
                        path: book_path.to_string_lossy().into_owned(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Extract and reconcile one title directory. Any error here is an
    /// item-level failure handled by the caller.
    async fn process_book_directory(
        &self,
        book_path: &Path,
        author_dir: &str,
        book_dir: &str,
        summary: &mut ScanSummary,
    ) -> shelfmark_common::Result<()> {
        let Some(record) = self
            .extractor
            .scan_book_directory(book_path, author_dir, book_dir)?
        else {
            return Ok(());
        };

        summary.books_found += 1;
        self.reconcile(&record, summary).await
    }

    /// Insert or update by external key.
    async fn reconcile(
        &self,
        record: &BookRecord,
        summary: &mut ScanSummary,
    ) -> shelfmark_common::Result<()> {
        match books::find_by_external_id(&self.db, &record.external_id).await? {
            Some(existing) => {
                books::update_book(&self.db, existing.id, record).await?;
                debug!(title = %record.title, "Updated book");
                summary.books_updated += 1;
            }
            None => {
                books::insert_book(&self.db, record).await?;
                debug!(title = %record.title, author = %record.author_name, "Added new book");
                summary.books_added += 1;
            }
        }
        Ok(())
    }
}
