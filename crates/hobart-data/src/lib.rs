#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod repository;
pub mod store;
pub mod types;

pub use error::{DataError, Result};
pub use repository::{FundamentalsRepository, MetricsStore, PriceSeriesSource};
pub use store::{SqliteStore, StoreStats};
pub use types::{
    DerivedMetricRow, Listing, PriceObservation, Security, SecurityId, SharesRecord,
    StatementField, StatementPeriod, Symbol,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
