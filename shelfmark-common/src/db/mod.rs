//! Shared database access for Shelfmark

mod init;

pub use init::{create_schema, init_database};
