//! Configuration loading and path resolution
//!
//! Resolution priority for every configurable path/value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the audiobook library root.
pub const LIBRARY_PATH_ENV: &str = "SHELFMARK_LIBRARY_PATH";
/// Environment variable naming the data folder (database location).
pub const DATA_FOLDER_ENV: &str = "SHELFMARK_DATA_FOLDER";
/// Environment variable overriding the HTTP port.
pub const PORT_ENV: &str = "SHELFMARK_PORT";

/// Default library root when nothing is configured.
///
/// Matches the conventional container mount point for the library volume.
const DEFAULT_LIBRARY_PATH: &str = "/audiobooks";

/// Default HTTP port.
const DEFAULT_PORT: u16 = 8081;

/// Optional on-disk configuration, `~/.config/shelfmark/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub library_path: Option<String>,
    pub data_folder: Option<String>,
    pub port: Option<u16>,
}

/// Load the TOML config file if one exists.
///
/// A missing file is normal (returns `None`); a file that exists but does
/// not parse is reported as a warning and otherwise ignored, so a broken
/// config never prevents startup.
pub fn load_toml_config() -> Option<TomlConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read config file, ignoring");
            return None;
        }
    };
    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse config file, ignoring");
            None
        }
    }
}

/// Platform config file location (`<config dir>/shelfmark/config.toml`)
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shelfmark").join("config.toml"))
}

/// Resolve the library root directory.
pub fn resolve_library_path(cli_arg: Option<&Path>, config: Option<&TomlConfig>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(LIBRARY_PATH_ENV) {
        return PathBuf::from(path);
    }
    if let Some(path) = config.and_then(|c| c.library_path.as_deref()) {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_LIBRARY_PATH)
}

/// Resolve the data folder holding the catalog database.
pub fn resolve_data_folder(cli_arg: Option<&Path>, config: Option<&TomlConfig>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        return PathBuf::from(path);
    }
    if let Some(path) = config.and_then(|c| c.data_folder.as_deref()) {
        return PathBuf::from(path);
    }
    default_data_folder()
}

/// Resolve the HTTP listen port.
pub fn resolve_port(cli_arg: Option<u16>, config: Option<&TomlConfig>) -> u16 {
    if let Some(port) = cli_arg {
        return port;
    }
    if let Ok(value) = std::env::var(PORT_ENV) {
        match value.parse::<u16>() {
            Ok(port) => return port,
            Err(_) => warn!(value = %value, "Ignoring unparseable {}", PORT_ENV),
        }
    }
    if let Some(port) = config.and_then(|c| c.port) {
        return port;
    }
    DEFAULT_PORT
}

/// OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("shelfmark"))
        .unwrap_or_else(|| PathBuf::from("./shelfmark_data"))
}

/// Ensure the data folder exists and return the database path inside it.
pub fn prepare_data_folder(data_folder: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_folder)?;
    Ok(data_folder.join("shelfmark.db"))
}
