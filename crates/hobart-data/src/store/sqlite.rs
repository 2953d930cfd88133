//! SQLite operational store for securities, fundamentals, and prices.

use crate::error::{DataError, Result};
use crate::repository::{FundamentalsRepository, MetricsStore, PriceSeriesSource};
use crate::types::{
    DerivedMetricRow, Listing, PriceObservation, Security, SecurityId, SharesRecord,
    StatementField, StatementPeriod, Symbol,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite store backing the derivation pipeline.
///
/// Holds the tracked universe, point-in-time fundamentals, daily prices,
/// and an operational mirror of derived metric rows for point lookups.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SQLite store.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        // Securities table (tracked universe)
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS securities (
                security_id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                listing TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_securities_updated ON securities(updated_at)",
            [],
        )?;

        // Quarterly statements table; statement field columns follow
        // StatementField::ALL order
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS statements (
                security_id TEXT NOT NULL,
                effective_date TEXT NOT NULL,
                shares_outstanding REAL NOT NULL,

                revenue REAL,
                net_income REAL,
                gross_profit REAL,
                operating_income REAL,
                operating_cash_flow REAL,
                stockholders_equity REAL,
                total_debt REAL,
                short_term_debt REAL,
                long_term_debt REAL,
                cash_and_equivalents REAL,
                short_term_investments REAL,

                PRIMARY KEY (security_id, effective_date)
            )",
            [],
        )?;

        // Shares-outstanding records for foreign listings
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS foreign_shares (
                security_id TEXT NOT NULL,
                effective_date TEXT NOT NULL,
                shares_outstanding REAL NOT NULL,
                PRIMARY KEY (security_id, effective_date)
            )",
            [],
        )?;

        // Daily close prices
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_prices (
                security_id TEXT NOT NULL,
                date TEXT NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (security_id, date)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_prices_security_date ON daily_prices(security_id, date)",
            [],
        )?;

        // Operational mirror of derived metric rows
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS security_metrics (
                security_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                price REAL NOT NULL,
                volume INTEGER NOT NULL,
                market_cap REAL NOT NULL,
                pe_ratio_ttm REAL,
                ps_ratio_ttm REAL,
                pb_ratio REAL,
                enterprise_value REAL,
                listing TEXT NOT NULL,
                computed_at TEXT NOT NULL,
                PRIMARY KEY (security_id, date)
            )",
            [],
        )?;

        Ok(())
    }

    /// Store securities in a batch, replacing existing rows by identifier.
    pub fn put_securities(&self, securities: &[Security]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for security in securities {
            tx.execute(
                "INSERT OR REPLACE INTO securities (security_id, symbol, listing, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    security.id.as_str(),
                    security.symbol.as_str(),
                    security.listing.to_db_str(),
                    security.updated_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get the tracked universe, ordered by symbol.
    ///
    /// With `changed_since`, only securities whose source record changed at
    /// or after the cutoff are returned.
    pub fn get_securities(&self, changed_since: Option<DateTime<Utc>>) -> Result<Vec<Security>> {
        // An empty cutoff matches every row; RFC 3339 UTC text compares
        // chronologically.
        let cutoff = changed_since.map_or_else(String::new, |t| t.to_rfc3339());

        let mut stmt = self.conn.prepare(
            "SELECT security_id, symbol, listing, updated_at
             FROM securities
             WHERE updated_at >= ?1
             ORDER BY symbol",
        )?;

        let rows = stmt.query_map(params![cutoff], security_from_row)?;

        let mut securities = Vec::new();
        for row in rows {
            securities.push(row?);
        }

        Ok(securities)
    }

    /// Store statement periods in a batch.
    pub fn put_statements(&self, statements: &[StatementPeriod]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for statement in statements {
            tx.execute(
                "INSERT OR REPLACE INTO statements (
                    security_id, effective_date, shares_outstanding,
                    revenue, net_income, gross_profit, operating_income, operating_cash_flow,
                    stockholders_equity, total_debt, short_term_debt, long_term_debt,
                    cash_and_equivalents, short_term_investments
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    statement.security_id.as_str(),
                    statement.effective_date.to_string(),
                    statement.shares_outstanding,
                    statement.field(StatementField::Revenue),
                    statement.field(StatementField::NetIncome),
                    statement.field(StatementField::GrossProfit),
                    statement.field(StatementField::OperatingIncome),
                    statement.field(StatementField::OperatingCashFlow),
                    statement.field(StatementField::StockholdersEquity),
                    statement.field(StatementField::TotalDebt),
                    statement.field(StatementField::ShortTermDebt),
                    statement.field(StatementField::LongTermDebt),
                    statement.field(StatementField::CashAndEquivalents),
                    statement.field(StatementField::ShortTermInvestments),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get all statement periods for a security, ascending by effective date.
    pub fn get_statements(&self, security_id: &SecurityId) -> Result<Vec<StatementPeriod>> {
        let mut stmt = self.conn.prepare(
            "SELECT security_id, effective_date, shares_outstanding,
                    revenue, net_income, gross_profit, operating_income, operating_cash_flow,
                    stockholders_equity, total_debt, short_term_debt, long_term_debt,
                    cash_and_equivalents, short_term_investments
             FROM statements
             WHERE security_id = ?1
             ORDER BY effective_date ASC",
        )?;

        let rows = stmt.query_map(params![security_id.as_str()], statement_from_row)?;

        let mut statements = Vec::new();
        for row in rows {
            statements.push(row?);
        }

        Ok(statements)
    }

    /// Store shares-outstanding records in a batch.
    pub fn put_shares_records(&self, records: &[SharesRecord]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for record in records {
            tx.execute(
                "INSERT OR REPLACE INTO foreign_shares (security_id, effective_date, shares_outstanding)
                 VALUES (?1, ?2, ?3)",
                params![
                    record.security_id.as_str(),
                    record.effective_date.to_string(),
                    record.shares_outstanding,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get all shares-outstanding records for a security, ascending by
    /// effective date.
    pub fn get_shares_records(&self, security_id: &SecurityId) -> Result<Vec<SharesRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT security_id, effective_date, shares_outstanding
             FROM foreign_shares
             WHERE security_id = ?1
             ORDER BY effective_date ASC",
        )?;

        let rows = stmt.query_map(params![security_id.as_str()], |row| {
            Ok(SharesRecord {
                security_id: SecurityId::new(row.get::<_, String>(0)?),
                effective_date: date_from_db(&row.get::<_, String>(1)?)?,
                shares_outstanding: row.get(2)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    /// Store daily price observations in a batch.
    pub fn put_prices(&self, prices: &[PriceObservation]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for price in prices {
            tx.execute(
                "INSERT OR REPLACE INTO daily_prices (security_id, date, close, volume)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    price.security_id.as_str(),
                    price.date.to_string(),
                    price.close,
                    price.volume as i64,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get price observations in `[from, to]`, ascending by date.
    pub fn get_prices(
        &self,
        security_id: &SecurityId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceObservation>> {
        if from > to {
            return Err(DataError::InvalidDateRange {
                start: from.to_string(),
                end: to.to_string(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT security_id, date, close, volume
             FROM daily_prices
             WHERE security_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(
            params![security_id.as_str(), from.to_string(), to.to_string()],
            |row| {
                Ok(PriceObservation {
                    security_id: SecurityId::new(row.get::<_, String>(0)?),
                    date: date_from_db(&row.get::<_, String>(1)?)?,
                    close: row.get(2)?,
                    volume: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;

        let mut prices = Vec::new();
        for row in rows {
            prices.push(row?);
        }

        Ok(prices)
    }

    /// Store derived metric rows in the operational mirror, replacing
    /// existing rows by `(security_id, date)`.
    pub fn put_metrics(&self, rows: &[DerivedMetricRow]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for row in rows {
            tx.execute(
                "INSERT OR REPLACE INTO security_metrics (
                    security_id, symbol, date, price, volume, market_cap,
                    pe_ratio_ttm, ps_ratio_ttm, pb_ratio, enterprise_value,
                    listing, computed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    row.security_id.as_str(),
                    row.symbol.as_str(),
                    row.date.to_string(),
                    row.price,
                    row.volume as i64,
                    row.market_cap,
                    row.pe_ratio_ttm,
                    row.ps_ratio_ttm,
                    row.pb_ratio,
                    row.enterprise_value,
                    row.listing.to_db_str(),
                    row.computed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get the derived metric row for a security on a specific date.
    pub fn get_metric(
        &self,
        security_id: &SecurityId,
        date: NaiveDate,
    ) -> Result<Option<DerivedMetricRow>> {
        let result = self
            .conn
            .query_row(
                "SELECT security_id, symbol, date, price, volume, market_cap,
                        pe_ratio_ttm, ps_ratio_ttm, pb_ratio, enterprise_value,
                        listing, computed_at
                 FROM security_metrics
                 WHERE security_id = ?1 AND date = ?2",
                params![security_id.as_str(), date.to_string()],
                metric_from_row,
            )
            .optional()?;

        Ok(result)
    }

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let securities: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM securities", [], |row| row.get(0))?;

        let statements: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM statements", [], |row| row.get(0))?;

        let shares_records: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM foreign_shares", [], |row| row.get(0))?;

        let prices: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM daily_prices", [], |row| row.get(0))?;

        let metric_rows: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM security_metrics", [], |row| row.get(0))?;

        Ok(StoreStats {
            securities: securities as usize,
            statements: statements as usize,
            shares_records: shares_records as usize,
            prices: prices as usize,
            metric_rows: metric_rows as usize,
        })
    }
}

#[async_trait(?Send)]
impl FundamentalsRepository for SqliteStore {
    async fn list_statements(&self, security_id: &SecurityId) -> Result<Vec<StatementPeriod>> {
        self.get_statements(security_id)
    }

    async fn list_shares_records(&self, security_id: &SecurityId) -> Result<Vec<SharesRecord>> {
        self.get_shares_records(security_id)
    }

    async fn list_securities(&self, changed_since: Option<DateTime<Utc>>) -> Result<Vec<Security>> {
        self.get_securities(changed_since)
    }
}

#[async_trait(?Send)]
impl PriceSeriesSource for SqliteStore {
    async fn list_prices(
        &self,
        security_id: &SecurityId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceObservation>> {
        self.get_prices(security_id, from, to)
    }
}

#[async_trait(?Send)]
impl MetricsStore for SqliteStore {
    async fn upsert_metrics(&self, rows: &[DerivedMetricRow]) -> Result<()> {
        self.put_metrics(rows)
    }
}

/// Store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Number of tracked securities
    pub securities: usize,
    /// Number of statement periods
    pub statements: usize,
    /// Number of foreign shares-outstanding records
    pub shares_records: usize,
    /// Number of daily price observations
    pub prices: usize,
    /// Number of mirrored derived metric rows
    pub metric_rows: usize,
}

fn security_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Security> {
    Ok(Security {
        id: SecurityId::new(row.get::<_, String>(0)?),
        symbol: Symbol::new(row.get::<_, String>(1)?),
        listing: listing_from_db(&row.get::<_, String>(2)?)?,
        updated_at: timestamp_from_db(&row.get::<_, String>(3)?)?,
    })
}

fn statement_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StatementPeriod> {
    // Field columns start at index 3, in StatementField::ALL order.
    let mut fields = BTreeMap::new();
    for (offset, field) in StatementField::ALL.iter().enumerate() {
        let value: Option<f64> = row.get(3 + offset)?;
        // Non-finite stored values read back as absent.
        if let Some(value) = value.filter(|v| v.is_finite()) {
            fields.insert(*field, value);
        }
    }

    Ok(StatementPeriod {
        security_id: SecurityId::new(row.get::<_, String>(0)?),
        effective_date: date_from_db(&row.get::<_, String>(1)?)?,
        shares_outstanding: row.get(2)?,
        fields,
    })
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

fn listing_from_db(text: &str) -> rusqlite::Result<Listing> {
    Listing::from_db_str(text).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn security(id: &str, symbol: &str, listing: Listing) -> Security {
        Security {
            id: SecurityId::new(id),
            symbol: Symbol::new(symbol),
            listing,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_store_initialization() {
        let store = SqliteStore::in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_security_operations() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .put_securities(&[
                security("sec-2", "msft", Listing::Domestic),
                security("sec-1", "AAPL", Listing::Domestic),
                security("sec-3", "NVO", Listing::Foreign),
            ])
            .unwrap();

        // Ordered by symbol, symbols uppercased on the way in
        let securities = store.get_securities(None).unwrap();
        assert_eq!(securities.len(), 3);
        assert_eq!(securities[0].symbol.as_str(), "AAPL");
        assert_eq!(securities[1].symbol.as_str(), "MSFT");
        assert_eq!(securities[2].symbol.as_str(), "NVO");
        assert_eq!(securities[2].listing, Listing::Foreign);
    }

    #[test]
    fn test_security_changed_since_filter() {
        let store = SqliteStore::in_memory().unwrap();

        let old = Security {
            updated_at: Utc::now() - chrono::Duration::days(30),
            ..security("sec-1", "AAPL", Listing::Domestic)
        };
        let recent = security("sec-2", "MSFT", Listing::Domestic);
        store.put_securities(&[old, recent]).unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(7);
        let changed = store.get_securities(Some(cutoff)).unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].symbol.as_str(), "MSFT");

        let all = store.get_securities(None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_statement_operations() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-1");

        let later = StatementPeriod::new(
            id.clone(),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
            10.0,
        )
        .with_field(StatementField::Revenue, 1200.0)
        .with_field(StatementField::NetIncome, 120.0);

        let earlier = StatementPeriod::new(
            id.clone(),
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            10.0,
        )
        .with_field(StatementField::Revenue, 1000.0);

        store.put_statements(&[later, earlier]).unwrap();

        // Ascending by effective date regardless of insertion order
        let statements = store.get_statements(&id).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0].effective_date,
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap()
        );
        assert_eq!(statements[0].field(StatementField::Revenue), Some(1000.0));
        assert_eq!(statements[0].field(StatementField::NetIncome), None);
        assert_eq!(statements[1].field(StatementField::NetIncome), Some(120.0));
    }

    #[test]
    fn test_statement_replaced_on_same_effective_date() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-1");
        let date = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();

        let original = StatementPeriod::new(id.clone(), date, 10.0)
            .with_field(StatementField::NetIncome, 100.0);
        let restated = StatementPeriod::new(id.clone(), date, 10.0)
            .with_field(StatementField::NetIncome, 95.0);

        store.put_statements(&[original]).unwrap();
        store.put_statements(&[restated]).unwrap();

        let statements = store.get_statements(&id).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].field(StatementField::NetIncome), Some(95.0));
    }

    #[test]
    fn test_non_finite_field_reads_as_absent() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-1");

        let statement = StatementPeriod::new(
            id.clone(),
            NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
            10.0,
        )
        .with_field(StatementField::Revenue, f64::INFINITY)
        .with_field(StatementField::NetIncome, 50.0);

        store.put_statements(&[statement]).unwrap();

        let statements = store.get_statements(&id).unwrap();
        assert_eq!(statements[0].field(StatementField::Revenue), None);
        assert_eq!(statements[0].field(StatementField::NetIncome), Some(50.0));
    }

    #[test]
    fn test_shares_record_operations() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-3");

        store
            .put_shares_records(&[
                SharesRecord {
                    security_id: id.clone(),
                    effective_date: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
                    shares_outstanding: 1_100_000.0,
                },
                SharesRecord {
                    security_id: id.clone(),
                    effective_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                    shares_outstanding: 1_000_000.0,
                },
            ])
            .unwrap();

        let records = store.get_shares_records(&id).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].shares_outstanding, 1_000_000.0);
        assert_eq!(records[1].shares_outstanding, 1_100_000.0);
    }

    #[test]
    fn test_price_operations() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-1");

        let prices: Vec<PriceObservation> = (1..=5)
            .map(|day| PriceObservation {
                security_id: id.clone(),
                date: NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
                close: 100.0 + day as f64,
                volume: 1_000 * day as u64,
            })
            .collect();
        store.put_prices(&prices).unwrap();

        let range = store
            .get_prices(
                &id,
                NaiveDate::from_ymd_opt(2023, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2023, 3, 4).unwrap(),
            )
            .unwrap();
        assert_eq!(range.len(), 3);
        assert_eq!(range[0].close, 102.0);
        assert_eq!(range[2].close, 104.0);
        assert_eq!(range[2].volume, 4_000);
    }

    #[test]
    fn test_price_invalid_date_range() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-1");

        let result = store.get_prices(
            &id,
            NaiveDate::from_ymd_opt(2023, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 2).unwrap(),
        );
        assert!(matches!(result, Err(DataError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_metric_mirror_operations() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-1");
        let date = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();

        let row = DerivedMetricRow {
            security_id: id.clone(),
            symbol: Symbol::new("AAPL"),
            date,
            price: 50.0,
            volume: 10_000,
            market_cap: 500.0,
            pe_ratio_ttm: Some(1.25),
            ps_ratio_ttm: Some(0.5),
            pb_ratio: None,
            enterprise_value: Some(520.0),
            listing: Listing::Domestic,
            computed_at: Utc::now(),
        };

        store.put_metrics(std::slice::from_ref(&row)).unwrap();

        let fetched = store.get_metric(&id, date).unwrap().unwrap();
        assert_eq!(fetched.price, 50.0);
        assert_eq!(fetched.pe_ratio_ttm, Some(1.25));
        assert_eq!(fetched.pb_ratio, None);

        // Replaced, not duplicated, on re-upsert
        let updated = DerivedMetricRow {
            price: 51.0,
            ..row
        };
        store.put_metrics(&[updated]).unwrap();

        let fetched = store.get_metric(&id, date).unwrap().unwrap();
        assert_eq!(fetched.price, 51.0);
        assert_eq!(store.get_stats().unwrap().metric_rows, 1);

        let missing = store
            .get_metric(&id, NaiveDate::from_ymd_opt(2023, 3, 16).unwrap())
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_store_stats() {
        let store = SqliteStore::in_memory().unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.securities, 0);
        assert_eq!(stats.statements, 0);
        assert_eq!(stats.shares_records, 0);
        assert_eq!(stats.prices, 0);
        assert_eq!(stats.metric_rows, 0);
    }

    #[tokio::test]
    async fn test_repository_trait_access() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SecurityId::new("sec-1");

        store
            .put_securities(&[security("sec-1", "AAPL", Listing::Domestic)])
            .unwrap();
        store
            .put_prices(&[PriceObservation {
                security_id: id.clone(),
                date: NaiveDate::from_ymd_opt(2023, 3, 15).unwrap(),
                close: 50.0,
                volume: 100,
            }])
            .unwrap();

        let repo: &dyn FundamentalsRepository = &store;
        let universe = repo.list_securities(None).await.unwrap();
        assert_eq!(universe.len(), 1);

        let source: &dyn PriceSeriesSource = &store;
        let prices = source
            .list_prices(
                &id,
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(prices.len(), 1);
    }
}
