//! Batch orchestration across the security universe.
//!
//! The universe is partitioned into fixed-size batches. Within a batch,
//! every security is derived concurrently on one task; batches themselves
//! run strictly in sequence, each loaded into the warehouse and the
//! operational mirror before the next begins. A security that fails to
//! derive costs only itself; a batch that fails to load stops the run.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use hobart_data::repository::{FundamentalsRepository, MetricsStore, PriceSeriesSource};
use hobart_data::types::{DerivedMetricRow, Listing, Security};
use hobart_metrics::series::build_series;
use hobart_warehouse::MetricsWarehouse;

use crate::error::{PipelineError, Result};
use crate::report::{RunReport, SecurityFailure};

/// Number of securities derived and loaded per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default width of the incremental refresh window, in days.
pub const DEFAULT_REFRESH_WINDOW_DAYS: i64 = 14;

/// Default lookback for selecting changed securities, in days.
pub const DEFAULT_CHANGED_LOOKBACK_DAYS: i64 = 7;

/// Configuration for pipeline runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Securities per batch.
    pub batch_size: usize,
    /// First date of the full-hydration range.
    pub history_start: NaiveDate,
    /// Last date of the full-hydration range; `None` means today.
    pub history_end: Option<NaiveDate>,
    /// Width of the incremental refresh window, in days.
    pub refresh_window_days: i64,
    /// Lookback for selecting changed securities, in days.
    pub changed_lookback_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            history_start: NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid date"),
            history_end: None,
            refresh_window_days: DEFAULT_REFRESH_WINDOW_DAYS,
            changed_lookback_days: DEFAULT_CHANGED_LOOKBACK_DAYS,
        }
    }
}

/// Derive and load the configured history for the whole universe.
pub async fn run_hydration<R, S>(
    repo: &R,
    mirror: &S,
    warehouse: &MetricsWarehouse,
    config: &PipelineConfig,
) -> Result<RunReport>
where
    R: FundamentalsRepository + PriceSeriesSource,
    S: MetricsStore,
{
    let securities = repo.list_securities(None).await?;
    let to = config
        .history_end
        .unwrap_or_else(|| Utc::now().date_naive());

    run_range(
        repo,
        mirror,
        warehouse,
        securities,
        config.history_start,
        to,
        config.batch_size,
    )
    .await
}

/// Derive and load a trailing window for securities whose upstream source
/// record changed within the configured lookback.
pub async fn run_refresh<R, S>(
    repo: &R,
    mirror: &S,
    warehouse: &MetricsWarehouse,
    config: &PipelineConfig,
) -> Result<RunReport>
where
    R: FundamentalsRepository + PriceSeriesSource,
    S: MetricsStore,
{
    let changed_since = Utc::now() - Duration::days(config.changed_lookback_days);
    let securities = repo.list_securities(Some(changed_since)).await?;

    let to = Utc::now().date_naive();
    let from = to - Duration::days(config.refresh_window_days);

    run_range(repo, mirror, warehouse, securities, from, to, config.batch_size).await
}

/// Derive `[from, to]` for `securities` and load batch by batch.
///
/// The returned report covers the whole run. On a batch load failure the
/// remaining batches are not attempted and the load error is returned
/// after accounting finishes.
pub async fn run_range<R, S>(
    repo: &R,
    mirror: &S,
    warehouse: &MetricsWarehouse,
    securities: Vec<Security>,
    from: NaiveDate,
    to: NaiveDate,
    batch_size: usize,
) -> Result<RunReport>
where
    R: FundamentalsRepository + PriceSeriesSource,
    S: MetricsStore,
{
    let mut report = RunReport::new(securities.len());
    let batch_size = batch_size.max(1);
    let total_batches = securities.len().div_ceil(batch_size);
    let mut fatal: Option<PipelineError> = None;

    for (batch_index, batch) in securities.chunks(batch_size).enumerate() {
        println!(
            "Processing batch {}/{} ({} securities)...",
            batch_index + 1,
            total_batches,
            batch.len()
        );

        let computed_at = Utc::now();
        let results: Vec<(&Security, hobart_data::Result<Vec<DerivedMetricRow>>)> =
            stream::iter(batch)
                .map(|security| async move {
                    (security, derive_security(repo, security, from, to, computed_at).await)
                })
                .buffer_unordered(batch.len())
                .collect()
                .await;

        let mut batch_rows: Vec<DerivedMetricRow> = Vec::new();
        for (security, outcome) in results {
            match outcome {
                Ok(rows) if rows.is_empty() => {
                    eprintln!(
                        "Warning: no derivable rows for {} in {}..{}",
                        security.symbol, from, to
                    );
                    report.securities_skipped += 1;
                }
                Ok(rows) => {
                    report.securities_derived += 1;
                    batch_rows.extend(rows);
                }
                Err(e) => {
                    eprintln!("Warning: Failed to derive metrics for {}: {}", security.symbol, e);
                    report.failures.push(SecurityFailure {
                        security_id: security.id.clone(),
                        symbol: security.symbol.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        match load_batch(mirror, warehouse, &batch_rows).await {
            Ok(()) => {
                report.rows_loaded += batch_rows.len();
                report.batches_completed += 1;
            }
            Err(e) => {
                eprintln!(
                    "Warning: batch {}/{} failed to load, stopping run: {}",
                    batch_index + 1,
                    total_batches,
                    e
                );
                fatal = Some(e);
                break;
            }
        }
    }

    report.finished_at = Utc::now();

    match fatal {
        Some(error) => Err(error),
        None => Ok(report),
    }
}

/// Derive the full metric series for one security.
async fn derive_security<R>(
    repo: &R,
    security: &Security,
    from: NaiveDate,
    to: NaiveDate,
    computed_at: DateTime<Utc>,
) -> hobart_data::Result<Vec<DerivedMetricRow>>
where
    R: FundamentalsRepository + PriceSeriesSource,
{
    let prices = repo.list_prices(&security.id, from, to).await?;
    if prices.is_empty() {
        return Ok(Vec::new());
    }

    match security.listing {
        Listing::Domestic => {
            let statements = repo.list_statements(&security.id).await?;
            Ok(build_series(security, &statements, &[], &prices, computed_at))
        }
        Listing::Foreign => {
            let shares_records = repo.list_shares_records(&security.id).await?;
            Ok(build_series(security, &[], &shares_records, &prices, computed_at))
        }
    }
}

/// Load one batch into the warehouse, then mirror it for point lookups.
async fn load_batch<S: MetricsStore>(
    mirror: &S,
    warehouse: &MetricsWarehouse,
    rows: &[DerivedMetricRow],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    warehouse.merge_rows(rows)?;
    mirror.upsert_metrics(rows).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hobart_data::types::{
        PriceObservation, SecurityId, SharesRecord, StatementField, StatementPeriod, Symbol,
    };
    use hobart_data::{DataError, SqliteStore};
    use hobart_warehouse::RetryPolicy;
    use std::collections::HashMap;

    struct FakeRepo {
        securities: Vec<Security>,
        statements: HashMap<String, Vec<StatementPeriod>>,
        shares: HashMap<String, Vec<SharesRecord>>,
        prices: HashMap<String, Vec<PriceObservation>>,
        fail_statements_for: Option<String>,
    }

    impl FakeRepo {
        fn new() -> Self {
            Self {
                securities: Vec::new(),
                statements: HashMap::new(),
                shares: HashMap::new(),
                prices: HashMap::new(),
                fail_statements_for: None,
            }
        }
    }

    #[async_trait(?Send)]
    impl FundamentalsRepository for FakeRepo {
        async fn list_statements(
            &self,
            security_id: &SecurityId,
        ) -> hobart_data::Result<Vec<StatementPeriod>> {
            if self.fail_statements_for.as_deref() == Some(security_id.as_str()) {
                return Err(DataError::Parse("corrupt statement row".to_string()));
            }
            Ok(self
                .statements
                .get(security_id.as_str())
                .cloned()
                .unwrap_or_default())
        }

        async fn list_shares_records(
            &self,
            security_id: &SecurityId,
        ) -> hobart_data::Result<Vec<SharesRecord>> {
            Ok(self
                .shares
                .get(security_id.as_str())
                .cloned()
                .unwrap_or_default())
        }

        async fn list_securities(
            &self,
            changed_since: Option<DateTime<Utc>>,
        ) -> hobart_data::Result<Vec<Security>> {
            Ok(self
                .securities
                .iter()
                .filter(|s| changed_since.is_none_or(|cutoff| s.updated_at >= cutoff))
                .cloned()
                .collect())
        }
    }

    #[async_trait(?Send)]
    impl PriceSeriesSource for FakeRepo {
        async fn list_prices(
            &self,
            security_id: &SecurityId,
            from: NaiveDate,
            to: NaiveDate,
        ) -> hobart_data::Result<Vec<PriceObservation>> {
            Ok(self
                .prices
                .get(security_id.as_str())
                .map(|series| {
                    series
                        .iter()
                        .filter(|p| p.date >= from && p.date <= to)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn security(id: &str, symbol: &str, listing: Listing) -> Security {
        Security {
            id: SecurityId::new(id),
            symbol: Symbol::new(symbol),
            listing,
            updated_at: Utc::now(),
        }
    }

    fn add_domestic(repo: &mut FakeRepo, id: &str, symbol: &str, net_income: f64) {
        repo.securities.push(security(id, symbol, Listing::Domestic));
        repo.statements.insert(
            id.to_string(),
            vec![
                StatementPeriod::new(SecurityId::new(id), date(2023, 3, 31), 10.0)
                    .with_field(StatementField::NetIncome, net_income),
            ],
        );
        repo.prices.insert(
            id.to_string(),
            vec![
                PriceObservation {
                    security_id: SecurityId::new(id),
                    date: date(2023, 4, 3),
                    close: 50.0,
                    volume: 1_000,
                },
                PriceObservation {
                    security_id: SecurityId::new(id),
                    date: date(2023, 4, 4),
                    close: 51.0,
                    volume: 1_100,
                },
            ],
        );
    }

    async fn ready_warehouse() -> MetricsWarehouse {
        let warehouse = MetricsWarehouse::in_memory().unwrap();
        warehouse.ensure_table(RetryPolicy::default()).await.unwrap();
        warehouse
    }

    fn test_config(batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            batch_size,
            history_start: date(2023, 1, 1),
            history_end: Some(date(2023, 12, 31)),
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_hydration_end_to_end() {
        let mut repo = FakeRepo::new();
        add_domestic(&mut repo, "sec-1", "AAPL", 100.0);
        add_domestic(&mut repo, "sec-2", "MSFT", 200.0);

        // Foreign security with shares records
        repo.securities.push(security("sec-3", "NVO", Listing::Foreign));
        repo.shares.insert(
            "sec-3".to_string(),
            vec![SharesRecord {
                security_id: SecurityId::new("sec-3"),
                effective_date: date(2023, 1, 1),
                shares_outstanding: 1_000_000.0,
            }],
        );
        repo.prices.insert(
            "sec-3".to_string(),
            vec![PriceObservation {
                security_id: SecurityId::new("sec-3"),
                date: date(2023, 3, 15),
                close: 12.50,
                volume: 500,
            }],
        );

        // Security with no prices at all: skipped, not failed
        repo.securities.push(security("sec-4", "GHST", Listing::Domestic));

        let mirror = SqliteStore::in_memory().unwrap();
        let warehouse = ready_warehouse().await;

        let report = run_hydration(&repo, &mirror, &warehouse, &test_config(2))
            .await
            .unwrap();

        assert_eq!(report.securities_total, 4);
        assert_eq!(report.securities_derived, 3);
        assert_eq!(report.securities_skipped, 1);
        assert!(report.failures.is_empty());
        assert_eq!(report.rows_loaded, 5);
        assert_eq!(report.batches_completed, 2);

        let stored = warehouse.fetch_rows(None).unwrap();
        assert_eq!(stored.len(), 5);

        // Mirror serves point lookups for the same rows
        let mirrored = mirror
            .get_metric(&SecurityId::new("sec-3"), date(2023, 3, 15))
            .unwrap()
            .unwrap();
        assert_eq!(mirrored.market_cap, 12_500_000.0);
        assert!(mirrored.pe_ratio_ttm.is_none());
    }

    #[tokio::test]
    async fn test_derivation_failure_isolated_to_security() {
        let mut repo = FakeRepo::new();
        add_domestic(&mut repo, "sec-1", "AAPL", 100.0);
        add_domestic(&mut repo, "sec-2", "MSFT", 200.0);
        add_domestic(&mut repo, "sec-3", "GOOG", 300.0);
        repo.fail_statements_for = Some("sec-2".to_string());

        let mirror = SqliteStore::in_memory().unwrap();
        let warehouse = ready_warehouse().await;

        let report = run_hydration(&repo, &mirror, &warehouse, &test_config(10))
            .await
            .unwrap();

        assert_eq!(report.securities_derived, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol.as_str(), "MSFT");
        assert!(report.failures[0].message.contains("corrupt"));

        // The failing security's batch still loaded everyone else
        assert_eq!(report.batches_completed, 1);
        let stored = warehouse.fetch_rows(None).unwrap();
        assert_eq!(stored.len(), 4);
        assert!(stored.iter().all(|r| r.symbol.as_str() != "MSFT"));
    }

    #[tokio::test]
    async fn test_load_failure_stops_run() {
        let mut repo = FakeRepo::new();
        add_domestic(&mut repo, "sec-1", "AAPL", 100.0);
        add_domestic(&mut repo, "sec-2", "MSFT", 200.0);

        let mirror = SqliteStore::in_memory().unwrap();
        // Durable table never created, so the first batch merge fails
        let warehouse = MetricsWarehouse::in_memory().unwrap();

        let result = run_hydration(&repo, &mirror, &warehouse, &test_config(1)).await;
        assert!(matches!(result, Err(PipelineError::Warehouse(_))));
    }

    #[tokio::test]
    async fn test_refresh_selects_changed_securities_only() {
        let today = Utc::now().date_naive();
        let mut repo = FakeRepo::new();

        let stale = Security {
            updated_at: Utc::now() - Duration::days(30),
            ..security("sec-1", "AAPL", Listing::Domestic)
        };
        let fresh = security("sec-2", "MSFT", Listing::Domestic);
        repo.securities.push(stale);
        repo.securities.push(fresh);

        for id in ["sec-1", "sec-2"] {
            repo.statements.insert(
                id.to_string(),
                vec![
                    StatementPeriod::new(SecurityId::new(id), today - Duration::days(60), 10.0)
                        .with_field(StatementField::NetIncome, 100.0),
                ],
            );
            repo.prices.insert(
                id.to_string(),
                vec![PriceObservation {
                    security_id: SecurityId::new(id),
                    date: today - Duration::days(1),
                    close: 50.0,
                    volume: 1_000,
                }],
            );
        }

        let mirror = SqliteStore::in_memory().unwrap();
        let warehouse = ready_warehouse().await;

        let report = run_refresh(&repo, &mirror, &warehouse, &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(report.securities_total, 1);
        assert_eq!(report.securities_derived, 1);

        let stored = warehouse.fetch_rows(None).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].symbol.as_str(), "MSFT");
    }

    #[tokio::test]
    async fn test_empty_universe() {
        let repo = FakeRepo::new();
        let mirror = SqliteStore::in_memory().unwrap();
        let warehouse = ready_warehouse().await;

        let report = run_hydration(&repo, &mirror, &warehouse, &test_config(50))
            .await
            .unwrap();

        assert_eq!(report.securities_total, 0);
        assert_eq!(report.rows_loaded, 0);
        assert_eq!(report.batches_completed, 0);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let mut repo = FakeRepo::new();
        add_domestic(&mut repo, "sec-1", "AAPL", 100.0);

        let mirror = SqliteStore::in_memory().unwrap();
        let warehouse = ready_warehouse().await;
        let config = test_config(50);

        run_hydration(&repo, &mirror, &warehouse, &config).await.unwrap();
        let first = warehouse.fetch_rows(None).unwrap();

        run_hydration(&repo, &mirror, &warehouse, &config).await.unwrap();
        let second = warehouse.fetch_rows(None).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), first.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.security_id, b.security_id);
            assert_eq!(a.date, b.date);
            assert_eq!(a.price, b.price);
            assert_eq!(a.pe_ratio_ttm, b.pe_ratio_ttm);
        }
    }
}
