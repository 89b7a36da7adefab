//! Domain models for the scanner service

pub mod book;
pub mod scan;

pub use book::{Book, BookDetail, BookRecord, BookSummary, SidecarMetadata};
pub use scan::{ScanItemError, ScanRun, ScanRunStatus, ScanStatus, ScanSummary, ScanType};
