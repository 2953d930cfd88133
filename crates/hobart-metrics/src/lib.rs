#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod asof;
pub mod series;
pub mod ttm;

pub use asof::{AsOfJoiner, Dated};
pub use series::build_series;
pub use ttm::{TTM_WINDOW, TtmValuation, aggregate};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
