//! # Shelfmark Common Library
//!
//! Shared code for the Shelfmark audiobook catalog:
//! - Error types
//! - Configuration loading and path resolution
//! - Database initialization and schema creation

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
