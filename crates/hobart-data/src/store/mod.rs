//! Operational storage layer.

pub mod sqlite;

pub use sqlite::{SqliteStore, StoreStats};
