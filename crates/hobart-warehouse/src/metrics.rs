//! Analytical store for derived valuation metrics.

use chrono::{DateTime, NaiveDate, Utc};
use hobart_data::types::{DerivedMetricRow, SecurityId, Symbol};
use rusqlite::types::Value;
use rusqlite::{Connection, params};
use std::path::Path;

use crate::error::{Result, WarehouseError};
use crate::loader::{StageRow, stage_and_merge};
use crate::retry::{RetryPolicy, converge};
use crate::schema::{ColumnSpec, ColumnType, TableSpec};

/// Durable metrics table schema; the merge key is `(security_id, date)`.
pub const METRICS_TABLE: TableSpec = TableSpec {
    name: "security_metrics",
    columns: &[
        ColumnSpec::required("security_id", ColumnType::Text),
        ColumnSpec::required("symbol", ColumnType::Text),
        ColumnSpec::required("date", ColumnType::Text),
        ColumnSpec::required("price", ColumnType::Real),
        ColumnSpec::required("volume", ColumnType::Integer),
        ColumnSpec::required("market_cap", ColumnType::Real),
        ColumnSpec::nullable("pe_ratio_ttm", ColumnType::Real),
        ColumnSpec::nullable("ps_ratio_ttm", ColumnType::Real),
        ColumnSpec::nullable("pb_ratio", ColumnType::Real),
        ColumnSpec::nullable("enterprise_value", ColumnType::Real),
        ColumnSpec::required("listing", ColumnType::Text),
        ColumnSpec::required("computed_at", ColumnType::Text),
    ],
    key: &["security_id", "date"],
};

impl StageRow for DerivedMetricRow {
    fn bind_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.security_id.as_str().to_string()),
            Value::from(self.symbol.as_str().to_string()),
            Value::from(self.date.to_string()),
            Value::from(self.price),
            Value::from(self.volume as i64),
            Value::from(self.market_cap),
            optional_real(self.pe_ratio_ttm),
            optional_real(self.ps_ratio_ttm),
            optional_real(self.pb_ratio),
            optional_real(self.enterprise_value),
            Value::from(self.listing.to_db_str().to_string()),
            Value::from(self.computed_at.to_rfc3339()),
        ]
    }
}

fn optional_real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

/// Analytical warehouse holding the durable metrics table.
#[derive(Debug)]
pub struct MetricsWarehouse {
    conn: Connection,
}

impl MetricsWarehouse {
    /// Open (or create) the warehouse database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Create an in-memory warehouse (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Ensure the durable metrics table exists, retrying under `policy`
    /// while store metadata converges.
    pub async fn ensure_table(&self, policy: RetryPolicy) -> Result<()> {
        converge(policy, "create table security_metrics", || {
            self.conn
                .execute(&METRICS_TABLE.create_sql(METRICS_TABLE.name), [])
                .map(|_| ())
        })
        .await
        .map_err(|(attempts, source)| WarehouseError::TableCreation {
            table: METRICS_TABLE.name.to_string(),
            attempts,
            source,
        })
    }

    /// Stage and merge a batch of rows. Returns the merged row count.
    pub fn merge_rows(&self, rows: &[DerivedMetricRow]) -> Result<usize> {
        stage_and_merge(&self.conn, &METRICS_TABLE, rows)
    }

    /// All rows, optionally restricted to one symbol, ordered by
    /// `(security_id, date)`.
    pub fn fetch_rows(&self, symbol: Option<&str>) -> Result<Vec<DerivedMetricRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT security_id, symbol, date, price, volume, market_cap,
                    pe_ratio_ttm, ps_ratio_ttm, pb_ratio, enterprise_value,
                    listing, computed_at
             FROM security_metrics
             WHERE ?1 IS NULL OR symbol = ?1
             ORDER BY security_id, date",
        )?;

        let mapped = stmt.query_map(params![symbol], metric_from_row)?;

        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }

        Ok(rows)
    }

    /// Get warehouse statistics.
    pub fn get_stats(&self) -> Result<WarehouseStats> {
        let metric_rows: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM security_metrics", [], |row| row.get(0))?;

        let securities: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT security_id) FROM security_metrics",
            [],
            |row| row.get(0),
        )?;

        let (earliest_date, latest_date) = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM security_metrics",
            [],
            |row| {
                let earliest: Option<String> = row.get(0)?;
                let latest: Option<String> = row.get(1)?;
                Ok((
                    earliest.map(|s| date_from_db(&s)).transpose()?,
                    latest.map(|s| date_from_db(&s)).transpose()?,
                ))
            },
        )?;

        Ok(WarehouseStats {
            metric_rows: metric_rows as usize,
            securities: securities as usize,
            earliest_date,
            latest_date,
        })
    }
}

/// Warehouse statistics.
#[derive(Debug, Clone)]
pub struct WarehouseStats {
    /// Number of derived metric rows
    pub metric_rows: usize,
    /// Number of distinct securities with rows
    pub securities: usize,
    /// Earliest row date
    pub earliest_date: Option<NaiveDate>,
    /// Latest row date
    pub latest_date: Option<NaiveDate>,
}

fn metric_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DerivedMetricRow> {
    Ok(DerivedMetricRow {
        security_id: SecurityId::new(row.get::<_, String>(0)?),
        symbol: Symbol::new(row.get::<_, String>(1)?),
        date: date_from_db(&row.get::<_, String>(2)?)?,
        price: row.get(3)?,
        volume: row.get::<_, i64>(4)? as u64,
        market_cap: row.get(5)?,
        pe_ratio_ttm: row.get(6)?,
        ps_ratio_ttm: row.get(7)?,
        pb_ratio: row.get(8)?,
        enterprise_value: row.get(9)?,
        listing: listing_from_db(&row.get::<_, String>(10)?)?,
        computed_at: timestamp_from_db(&row.get::<_, String>(11)?)?,
    })
}

fn date_from_db(text: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn timestamp_from_db(text: &str) -> rusqlite::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?
        .with_timezone(&Utc))
}

fn listing_from_db(text: &str) -> rusqlite::Result<hobart_data::types::Listing> {
    hobart_data::types::Listing::from_db_str(text)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
