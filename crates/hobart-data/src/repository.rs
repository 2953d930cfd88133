//! Repository traits consumed by the derivation pipeline.
//!
//! The traits are object-safe and deliberately `?Send`: the bundled SQLite
//! store holds a raw connection, and the pipeline drives all of a batch's
//! futures on one task.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::types::{DerivedMetricRow, PriceObservation, Security, SecurityId, SharesRecord, StatementPeriod};

/// Point-in-time access to the security universe and its fundamentals.
#[async_trait(?Send)]
pub trait FundamentalsRepository {
    /// All statement periods for a security, ascending by effective date.
    async fn list_statements(&self, security_id: &SecurityId) -> Result<Vec<StatementPeriod>>;

    /// All shares-outstanding records for a security, ascending by effective date.
    async fn list_shares_records(&self, security_id: &SecurityId) -> Result<Vec<SharesRecord>>;

    /// The tracked universe, optionally restricted to securities whose
    /// upstream source record changed at or after `changed_since`.
    async fn list_securities(&self, changed_since: Option<DateTime<Utc>>) -> Result<Vec<Security>>;
}

/// Daily close price history.
#[async_trait(?Send)]
pub trait PriceSeriesSource {
    /// Price observations in `[from, to]`, ascending by date.
    async fn list_prices(
        &self,
        security_id: &SecurityId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceObservation>>;
}

/// Writable mirror of derived metric rows for operational point lookups.
#[async_trait(?Send)]
pub trait MetricsStore {
    /// Insert or replace rows keyed on `(security_id, date)`.
    async fn upsert_metrics(&self, rows: &[DerivedMetricRow]) -> Result<()>;
}
