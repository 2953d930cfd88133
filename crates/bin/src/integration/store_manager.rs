//! Store location and open helpers.
//!
//! Default database locations are platform-specific:
//! - Linux: `~/.local/share/hobart/`
//! - macOS: `~/Library/Application Support/hobart/`
//! - Windows: `%LOCALAPPDATA%\hobart\`

use hobart_data::SqliteStore;
use hobart_warehouse::MetricsWarehouse;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Get the default data directory path.
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hobart")
}

/// Get the default operational store database path.
pub(crate) fn default_store_path() -> PathBuf {
    default_data_dir().join("hobart.db")
}

/// Get the default analytical warehouse database path.
pub(crate) fn default_warehouse_path() -> PathBuf {
    default_data_dir().join("warehouse.db")
}

/// Open the operational store, creating its directory if needed.
pub(crate) fn open_store(path: Option<&Path>) -> Result<SqliteStore, Box<dyn Error>> {
    let path = path.map_or_else(default_store_path, Path::to_path_buf);
    ensure_parent(&path)?;
    Ok(SqliteStore::new(&path)?)
}

/// Open the analytical warehouse, creating its directory if needed.
pub(crate) fn open_warehouse(path: Option<&Path>) -> Result<MetricsWarehouse, Box<dyn Error>> {
    let path = path.map_or_else(default_warehouse_path, Path::to_path_buf);
    ensure_parent(&path)?;
    Ok(MetricsWarehouse::open(&path)?)
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
