//! Error types for warehouse operations.

use thiserror::Error;

/// Result type for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;

/// Errors that can occur while loading the analytical store.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Durable table never became usable within the retry budget
    #[error("Failed to create table {table} after {attempts} attempts: {source}")]
    TableCreation {
        /// Durable table name
        table: String,
        /// Attempts made before giving up
        attempts: u32,
        /// Last error observed
        source: rusqlite::Error,
    },

    /// Staging-table creation or population failed
    #[error("Staging load into {table} failed: {source}")]
    Staging {
        /// Staging table name
        table: String,
        /// Underlying error
        source: rusqlite::Error,
    },

    /// Merge into the durable table failed
    #[error("Merge of {rows} rows into {table} failed: {source}")]
    Merge {
        /// Durable table name
        table: String,
        /// Rows in the failed batch
        rows: usize,
        /// Underlying error
        source: rusqlite::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
