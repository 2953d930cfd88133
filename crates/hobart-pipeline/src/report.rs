//! Run accounting returned by pipeline entry points.

use chrono::{DateTime, Duration, Utc};
use hobart_data::types::{SecurityId, Symbol};

/// One security that failed to derive during a run.
#[derive(Debug, Clone)]
pub struct SecurityFailure {
    /// Security identifier.
    pub security_id: SecurityId,
    /// Symbol at run time.
    pub symbol: Symbol,
    /// Error message captured from the derivation.
    pub message: String,
}

/// Accounting for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Securities selected for the run.
    pub securities_total: usize,
    /// Securities that produced at least one derived row.
    pub securities_derived: usize,
    /// Securities skipped for lack of derivable data.
    pub securities_skipped: usize,
    /// Per-security derivation failures.
    pub failures: Vec<SecurityFailure>,
    /// Rows loaded into the warehouse and mirror.
    pub rows_loaded: usize,
    /// Batches fully loaded.
    pub batches_completed: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn new(securities_total: usize) -> Self {
        let now = Utc::now();
        Self {
            securities_total,
            securities_derived: 0,
            securities_skipped: 0,
            failures: Vec::new(),
            rows_loaded: 0,
            batches_completed: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.finished_at - self.started_at
    }
}
