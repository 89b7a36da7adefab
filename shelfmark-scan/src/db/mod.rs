//! Database access for the scanner service

pub mod books;
pub mod scan_history;
pub mod stats;
