#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod orchestrator;
pub mod report;

pub use error::{PipelineError, Result};
pub use orchestrator::{
    DEFAULT_BATCH_SIZE, DEFAULT_CHANGED_LOOKBACK_DAYS, DEFAULT_REFRESH_WINDOW_DAYS,
    PipelineConfig, run_hydration, run_range, run_refresh,
};
pub use report::{RunReport, SecurityFailure};

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
