//! Core domain types for the valuation metrics pipeline.
//!
//! This module defines the fundamental data structures:
//!
//! - [`SecurityId`] - Opaque upstream security identifier
//! - [`Symbol`] - Trading symbol/ticker
//! - [`Security`] - A security in the tracked universe
//! - [`StatementPeriod`] - Point-in-time quarterly statement data
//! - [`SharesRecord`] - Shares outstanding for foreign-listed securities
//! - [`PriceObservation`] - A daily close price
//! - [`DerivedMetricRow`] - Derived valuation metrics for one trading day

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Opaque identifier assigned to a security by the upstream data source.
///
/// Identifiers are stable across symbol changes, so all storage keys on
/// them rather than on the symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SecurityId(String);

impl SecurityId {
    /// Creates a new security identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SecurityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SecurityId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Listing classification of a security.
///
/// Domestic filers report full quarterly statements; foreign listings only
/// report shares outstanding, so their derived rows carry market cap alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Listing {
    /// Domestic filer with full quarterly statements.
    Domestic,
    /// Foreign listing with shares-outstanding records only.
    Foreign,
}

impl Listing {
    /// Convert to database string representation.
    #[must_use]
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::Foreign => "foreign",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, DataError> {
        match s {
            "domestic" => Ok(Self::Domestic),
            "foreign" => Ok(Self::Foreign),
            _ => Err(DataError::Parse(format!("unknown listing: {}", s))),
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

/// A security in the tracked universe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Security {
    /// Upstream identifier, stable across symbol changes.
    pub id: SecurityId,
    /// Current trading symbol.
    pub symbol: Symbol,
    /// Listing classification.
    pub listing: Listing,
    /// When the upstream source record last changed.
    pub updated_at: DateTime<Utc>,
}

/// Reported statement fields tracked by the pipeline.
///
/// The variant order here is also the column order in the statements table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatementField {
    /// Quarterly revenue.
    Revenue,
    /// Quarterly net income.
    NetIncome,
    /// Quarterly gross profit.
    GrossProfit,
    /// Quarterly operating income.
    OperatingIncome,
    /// Quarterly operating cash flow.
    OperatingCashFlow,
    /// Total stockholders equity at period end.
    StockholdersEquity,
    /// Total debt at period end.
    TotalDebt,
    /// Short-term debt at period end.
    ShortTermDebt,
    /// Long-term debt at period end.
    LongTermDebt,
    /// Cash and cash equivalents at period end.
    CashAndEquivalents,
    /// Short-term investments at period end.
    ShortTermInvestments,
}

impl StatementField {
    /// All fields, in statements-table column order.
    pub const ALL: [Self; 11] = [
        Self::Revenue,
        Self::NetIncome,
        Self::GrossProfit,
        Self::OperatingIncome,
        Self::OperatingCashFlow,
        Self::StockholdersEquity,
        Self::TotalDebt,
        Self::ShortTermDebt,
        Self::LongTermDebt,
        Self::CashAndEquivalents,
        Self::ShortTermInvestments,
    ];

    /// Stable column name in the statements table.
    #[must_use]
    pub const fn column_name(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::NetIncome => "net_income",
            Self::GrossProfit => "gross_profit",
            Self::OperatingIncome => "operating_income",
            Self::OperatingCashFlow => "operating_cash_flow",
            Self::StockholdersEquity => "stockholders_equity",
            Self::TotalDebt => "total_debt",
            Self::ShortTermDebt => "short_term_debt",
            Self::LongTermDebt => "long_term_debt",
            Self::CashAndEquivalents => "cash_and_equivalents",
            Self::ShortTermInvestments => "short_term_investments",
        }
    }
}

/// One quarterly statement period as reported, keyed by effective date.
///
/// The effective date is the date the figures became available, not the
/// fiscal period end. Any subset of [`StatementField`] values may be
/// present; absent fields were simply not reported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementPeriod {
    /// Security this period belongs to.
    pub security_id: SecurityId,
    /// Date the figures became available.
    pub effective_date: NaiveDate,
    /// Shares outstanding as reported with this period.
    pub shares_outstanding: f64,
    /// Reported field values.
    pub fields: BTreeMap<StatementField, f64>,
}

impl StatementPeriod {
    /// Creates an empty statement period.
    #[must_use]
    pub fn new(
        security_id: SecurityId,
        effective_date: NaiveDate,
        shares_outstanding: f64,
    ) -> Self {
        Self {
            security_id,
            effective_date,
            shares_outstanding,
            fields: BTreeMap::new(),
        }
    }

    /// Sets one reported field value.
    #[must_use]
    pub fn with_field(mut self, field: StatementField, value: f64) -> Self {
        self.fields.insert(field, value);
        self
    }

    /// Returns a reported field value, or `None` if it was not reported.
    #[must_use]
    pub fn field(&self, field: StatementField) -> Option<f64> {
        self.fields.get(&field).copied()
    }
}

/// Shares outstanding for a foreign-listed security, keyed by effective date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharesRecord {
    /// Security this record belongs to.
    pub security_id: SecurityId,
    /// Date the share count became effective.
    pub effective_date: NaiveDate,
    /// Shares outstanding.
    pub shares_outstanding: f64,
}

/// One daily close price observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Security this observation belongs to.
    pub security_id: SecurityId,
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub close: f64,
    /// Trading volume.
    pub volume: u64,
}

/// Derived valuation metrics for one security on one trading day.
///
/// Rows are unique per `(security_id, date)`. Ratio fields are `None`
/// whenever their inputs were unavailable or their denominator was not
/// strictly positive; foreign listings never carry ratios.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetricRow {
    /// Security this row belongs to.
    pub security_id: SecurityId,
    /// Symbol at derivation time.
    pub symbol: Symbol,
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub price: f64,
    /// Trading volume.
    pub volume: u64,
    /// Price times shares outstanding as of the trading date.
    pub market_cap: f64,
    /// Market cap over trailing-twelve-month net income.
    pub pe_ratio_ttm: Option<f64>,
    /// Market cap over trailing-twelve-month revenue.
    pub ps_ratio_ttm: Option<f64>,
    /// Market cap over latest stockholders equity.
    pub pb_ratio: Option<f64>,
    /// Market cap plus total debt minus cash and short-term investments.
    pub enterprise_value: Option<f64>,
    /// Listing classification at derivation time.
    pub listing: Listing,
    /// When the derivation ran.
    pub computed_at: DateTime<Utc>,
}
