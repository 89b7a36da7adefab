//! HTTP API handlers for the scanner service

pub mod books;
pub mod health;
pub mod library;

pub use books::book_routes;
pub use health::health_routes;
pub use library::library_routes;
