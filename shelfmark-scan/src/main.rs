//! shelfmark-scan - Audiobook library scanner service
//!
//! Walks a two-level `author/title` library tree, reconciles what it finds
//! against the catalog database, and serves the catalog plus scan control
//! over HTTP.

use anyhow::Result;
use clap::Parser;
use shelfmark_scan::services::LibraryScanner;
use shelfmark_scan::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "shelfmark-scan", about = "Shelfmark audiobook library scanner")]
struct Args {
    /// Library root directory (author/title tree)
    #[arg(long)]
    library: Option<PathBuf>,

    /// Data folder holding the catalog database
    #[arg(long)]
    data_folder: Option<PathBuf>,

    /// HTTP listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting shelfmark-scan v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let toml_config = shelfmark_common::config::load_toml_config();

    let library_path =
        shelfmark_common::config::resolve_library_path(args.library.as_deref(), toml_config.as_ref());
    let data_folder =
        shelfmark_common::config::resolve_data_folder(args.data_folder.as_deref(), toml_config.as_ref());
    let port = shelfmark_common::config::resolve_port(args.port, toml_config.as_ref());

    info!("Library path: {}", library_path.display());

    let db_path = shelfmark_common::config::prepare_data_folder(&data_folder)?;
    info!("Database: {}", db_path.display());

    let db_pool = shelfmark_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    let scanner = Arc::new(LibraryScanner::new(db_pool.clone(), library_path));
    if !scanner.validate_library_path() {
        // Startup proceeds; scan requests will be rejected until the
        // library path is mounted/configured
        warn!(
            path = %scanner.library_path().display(),
            "Library path is not accessible; scans will fail validation"
        );
    }

    let state = AppState::new(db_pool, scanner);
    let app = shelfmark_scan::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
