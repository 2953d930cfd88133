//! CSV seeding of the operational store.
//!
//! Imports securities, quarterly statements, foreign shares records, and
//! daily prices from CSV files. Optional numeric cells that fail to parse
//! (or are non-finite) coerce to absent; malformed required cells fail the
//! import with an error naming the offending line.

use chrono::{DateTime, NaiveDate, Utc};
use hobart_data::SqliteStore;
use hobart_data::types::{
    Listing, PriceObservation, Security, SecurityId, SharesRecord, StatementField,
    StatementPeriod, Symbol,
};
use serde::{Deserialize, Deserializer};
use std::error::Error;
use std::path::Path;

/// Parse an optional numeric cell, coercing malformed or non-finite values
/// to absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite()))
}

#[derive(Debug, Deserialize)]
struct SecurityRecord {
    security_id: String,
    symbol: String,
    listing: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct StatementRecord {
    security_id: String,
    effective_date: NaiveDate,
    shares_outstanding: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    revenue: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    net_income: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    gross_profit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    operating_income: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    operating_cash_flow: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    stockholders_equity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_debt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    short_term_debt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    long_term_debt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    cash_and_equivalents: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    short_term_investments: Option<f64>,
}

impl StatementRecord {
    fn field_values(&self) -> [(StatementField, Option<f64>); 11] {
        [
            (StatementField::Revenue, self.revenue),
            (StatementField::NetIncome, self.net_income),
            (StatementField::GrossProfit, self.gross_profit),
            (StatementField::OperatingIncome, self.operating_income),
            (StatementField::OperatingCashFlow, self.operating_cash_flow),
            (StatementField::StockholdersEquity, self.stockholders_equity),
            (StatementField::TotalDebt, self.total_debt),
            (StatementField::ShortTermDebt, self.short_term_debt),
            (StatementField::LongTermDebt, self.long_term_debt),
            (StatementField::CashAndEquivalents, self.cash_and_equivalents),
            (StatementField::ShortTermInvestments, self.short_term_investments),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct SharesCsvRecord {
    security_id: String,
    effective_date: NaiveDate,
    shares_outstanding: f64,
}

#[derive(Debug, Deserialize)]
struct PriceRecord {
    security_id: String,
    date: NaiveDate,
    close: f64,
    volume: u64,
}

fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        // csv errors carry the line number of the offending record
        let record: T = record.map_err(|e| format!("{}: {}", path.display(), e))?;
        records.push(record);
    }
    Ok(records)
}

/// Import securities from a CSV file. Returns the imported row count.
pub(crate) fn import_securities(
    store: &SqliteStore,
    path: &Path,
) -> Result<usize, Box<dyn Error>> {
    let records: Vec<SecurityRecord> = read_records(path)?;
    let mut securities = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let listing = Listing::from_db_str(&record.listing)
            .map_err(|e| format!("{}: line {}: {}", path.display(), index + 2, e))?;
        securities.push(Security {
            id: SecurityId::new(&record.security_id),
            symbol: Symbol::new(&record.symbol),
            listing,
            updated_at: record.updated_at,
        });
    }
    store.put_securities(&securities)?;
    Ok(securities.len())
}

/// Import quarterly statements from a CSV file. Returns the imported row count.
pub(crate) fn import_statements(
    store: &SqliteStore,
    path: &Path,
) -> Result<usize, Box<dyn Error>> {
    let records: Vec<StatementRecord> = read_records(path)?;
    let statements: Vec<StatementPeriod> = records
        .iter()
        .map(|record| {
            let mut period = StatementPeriod::new(
                SecurityId::new(&record.security_id),
                record.effective_date,
                record.shares_outstanding,
            );
            for (field, value) in record.field_values() {
                if let Some(value) = value {
                    period = period.with_field(field, value);
                }
            }
            period
        })
        .collect();
    store.put_statements(&statements)?;
    Ok(statements.len())
}

/// Import foreign shares-outstanding records from a CSV file. Returns the
/// imported row count.
pub(crate) fn import_shares(store: &SqliteStore, path: &Path) -> Result<usize, Box<dyn Error>> {
    let records: Vec<SharesCsvRecord> = read_records(path)?;
    let shares: Vec<SharesRecord> = records
        .iter()
        .map(|record| SharesRecord {
            security_id: SecurityId::new(&record.security_id),
            effective_date: record.effective_date,
            shares_outstanding: record.shares_outstanding,
        })
        .collect();
    store.put_shares_records(&shares)?;
    Ok(shares.len())
}

/// Import daily prices from a CSV file. Returns the imported row count.
pub(crate) fn import_prices(store: &SqliteStore, path: &Path) -> Result<usize, Box<dyn Error>> {
    let records: Vec<PriceRecord> = read_records(path)?;
    let prices: Vec<PriceObservation> = records
        .iter()
        .map(|record| PriceObservation {
            security_id: SecurityId::new(&record.security_id),
            date: record.date,
            close: record.close,
            volume: record.volume,
        })
        .collect();
    store.put_prices(&prices)?;
    Ok(prices.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_import_securities() {
        let path = write_temp(
            "hobart_test_securities.csv",
            "security_id,symbol,listing,updated_at\n\
             sec-1,aapl,domestic,2023-06-01T00:00:00Z\n\
             sec-2,NVO,foreign,2023-06-02T00:00:00Z\n",
        );
        let store = SqliteStore::in_memory().unwrap();

        let count = import_securities(&store, &path).unwrap();
        assert_eq!(count, 2);

        let securities = store.get_securities(None).unwrap();
        assert_eq!(securities.len(), 2);
        assert_eq!(securities[0].symbol.as_str(), "AAPL");
        assert_eq!(securities[1].listing, Listing::Foreign);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_import_securities_bad_listing_names_line() {
        let path = write_temp(
            "hobart_test_bad_listing.csv",
            "security_id,symbol,listing,updated_at\n\
             sec-1,AAPL,offshore,2023-06-01T00:00:00Z\n",
        );
        let store = SqliteStore::in_memory().unwrap();

        let err = import_securities(&store, &path).unwrap_err().to_string();
        assert!(err.contains("line 2"));
        assert!(err.contains("offshore"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_import_statements_coerces_malformed_optionals() {
        let path = write_temp(
            "hobart_test_statements.csv",
            "security_id,effective_date,shares_outstanding,revenue,net_income,gross_profit,\
             operating_income,operating_cash_flow,stockholders_equity,total_debt,\
             short_term_debt,long_term_debt,cash_and_equivalents,short_term_investments\n\
             sec-1,2023-03-31,1000,500.0,n/a,,,,200.0,,,,NaN,\n",
        );
        let store = SqliteStore::in_memory().unwrap();

        let count = import_statements(&store, &path).unwrap();
        assert_eq!(count, 1);

        let statements = store.get_statements(&SecurityId::new("sec-1")).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].field(StatementField::Revenue), Some(500.0));
        // "n/a" and "NaN" coerce to absent, never zero
        assert_eq!(statements[0].field(StatementField::NetIncome), None);
        assert_eq!(statements[0].field(StatementField::CashAndEquivalents), None);
        assert_eq!(
            statements[0].field(StatementField::StockholdersEquity),
            Some(200.0)
        );

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_import_statements_malformed_required_fails() {
        let path = write_temp(
            "hobart_test_bad_statement.csv",
            "security_id,effective_date,shares_outstanding\n\
             sec-1,not-a-date,1000\n",
        );
        let store = SqliteStore::in_memory().unwrap();

        let err = import_statements(&store, &path).unwrap_err().to_string();
        assert!(err.contains("line: 2") || err.contains("line 2"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_import_shares_and_prices() {
        let shares_path = write_temp(
            "hobart_test_shares.csv",
            "security_id,effective_date,shares_outstanding\n\
             sec-2,2023-01-01,1000000\n",
        );
        let prices_path = write_temp(
            "hobart_test_prices.csv",
            "security_id,date,close,volume\n\
             sec-2,2023-03-15,12.50,500\n\
             sec-2,2023-03-16,12.75,600\n",
        );
        let store = SqliteStore::in_memory().unwrap();

        assert_eq!(import_shares(&store, &shares_path).unwrap(), 1);
        assert_eq!(import_prices(&store, &prices_path).unwrap(), 2);

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.shares_records, 1);
        assert_eq!(stats.prices, 2);

        std::fs::remove_file(shares_path).ok();
        std::fs::remove_file(prices_path).ok();
    }
}
