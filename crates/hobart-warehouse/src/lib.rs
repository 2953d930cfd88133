#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod loader;
pub mod metrics;
pub mod retry;
pub mod schema;

pub use error::{Result, WarehouseError};
pub use loader::{MAX_BIND_PARAMS, StageRow, stage_and_merge};
pub use metrics::{METRICS_TABLE, MetricsWarehouse, WarehouseStats};
pub use retry::{RetryPolicy, converge};
pub use schema::{ColumnSpec, ColumnType, TableSpec};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
