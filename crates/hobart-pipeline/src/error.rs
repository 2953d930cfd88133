//! Error types for pipeline runs.

use thiserror::Error;

/// Result type for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that abort a pipeline run.
///
/// Per-security derivation failures are not errors at this level; they are
/// recorded in the run report and the run continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Universe selection or source read failed
    #[error("Data error: {0}")]
    Data(#[from] hobart_data::DataError),

    /// Batch load into the analytical store failed
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] hobart_warehouse::WarehouseError),
}
