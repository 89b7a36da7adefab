//! Scanner services
//!
//! - `directory_walker`: two-level library tree enumeration
//! - `metadata_extractor`: per-title metadata extraction
//! - `library_scanner`: scan coordination and reconciliation

pub mod directory_walker;
pub mod library_scanner;
pub mod metadata_extractor;

pub use library_scanner::{LibraryScanner, ScanError};
pub use metadata_extractor::MetadataExtractor;
