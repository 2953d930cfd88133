//! Hobart CLI binary.
//!
//! Command-line interface for the Hobart valuation metrics pipeline:
//! seed the operational store from CSV files, run full hydration or
//! incremental refresh, export derived rows, and inspect store contents.

mod integration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hobart_output::{ExportFormat, Exporter, render_run_report};
use hobart_pipeline::{
    DEFAULT_BATCH_SIZE, DEFAULT_CHANGED_LOOKBACK_DAYS, DEFAULT_REFRESH_WINDOW_DAYS,
    PipelineConfig, run_hydration, run_refresh,
};
use hobart_warehouse::RetryPolicy;
use indicatif::{ProgressBar, ProgressStyle};
use integration::importer;
use integration::store_manager::{open_store, open_warehouse};
use std::path::PathBuf;
use std::process;
use std::time::Duration as StdDuration;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: Point-in-time valuation metrics pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive and load the full configured history for the whole universe
    Hydrate {
        /// First date of the derivation range
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date of the derivation range (defaults to today)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Securities per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Operational store database path
        #[arg(long)]
        store: Option<PathBuf>,

        /// Analytical warehouse database path
        #[arg(long)]
        warehouse: Option<PathBuf>,
    },

    /// Derive and load a trailing window for recently changed securities
    Refresh {
        /// Width of the refresh window, in days
        #[arg(long, default_value_t = DEFAULT_REFRESH_WINDOW_DAYS)]
        window_days: i64,

        /// Lookback for selecting changed securities, in days
        #[arg(long, default_value_t = DEFAULT_CHANGED_LOOKBACK_DAYS)]
        lookback_days: i64,

        /// Securities per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Operational store database path
        #[arg(long)]
        store: Option<PathBuf>,

        /// Analytical warehouse database path
        #[arg(long)]
        warehouse: Option<PathBuf>,
    },

    /// Seed the operational store from CSV files
    Import {
        /// Securities CSV (security_id,symbol,listing,updated_at)
        #[arg(long)]
        securities: Option<PathBuf>,

        /// Quarterly statements CSV
        #[arg(long)]
        statements: Option<PathBuf>,

        /// Foreign shares-outstanding records CSV
        #[arg(long)]
        shares: Option<PathBuf>,

        /// Daily prices CSV (security_id,date,close,volume)
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Operational store database path
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Export derived metric rows from the warehouse
    Export {
        /// Output format (csv, json, or json-pretty)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Restrict to one symbol
        #[arg(long)]
        symbol: Option<String>,

        /// Analytical warehouse database path
        #[arg(long)]
        warehouse: Option<PathBuf>,
    },

    /// Show store and warehouse statistics
    Stats {
        /// Operational store database path
        #[arg(long)]
        store: Option<PathBuf>,

        /// Analytical warehouse database path
        #[arg(long)]
        warehouse: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Hydrate {
            from,
            to,
            batch_size,
            store,
            warehouse,
        } => {
            let mut config = PipelineConfig {
                batch_size,
                history_end: to,
                ..PipelineConfig::default()
            };
            if let Some(from) = from {
                config.history_start = from;
            }

            let store = open_store(store.as_deref())?;
            let warehouse = open_warehouse(warehouse.as_deref())?;
            warehouse.ensure_table(RetryPolicy::default()).await?;

            println!(
                "Hydrating {}..{}",
                config.history_start,
                config
                    .history_end
                    .map_or_else(|| "today".to_string(), |d| d.to_string())
            );
            let report = run_hydration(&store, &store, &warehouse, &config).await?;
            println!("\n{}", render_run_report(&report));
        }
        Commands::Refresh {
            window_days,
            lookback_days,
            batch_size,
            store,
            warehouse,
        } => {
            let config = PipelineConfig {
                batch_size,
                refresh_window_days: window_days,
                changed_lookback_days: lookback_days,
                ..PipelineConfig::default()
            };

            let store = open_store(store.as_deref())?;
            let warehouse = open_warehouse(warehouse.as_deref())?;
            warehouse.ensure_table(RetryPolicy::default()).await?;

            println!(
                "Refreshing last {} days (securities changed within {} days)",
                window_days, lookback_days
            );
            let report = run_refresh(&store, &store, &warehouse, &config).await?;
            println!("\n{}", render_run_report(&report));
        }
        Commands::Import {
            securities,
            statements,
            shares,
            prices,
            store,
        } => {
            if securities.is_none() && statements.is_none() && shares.is_none() && prices.is_none()
            {
                println!(
                    "No files selected. Use --securities, --statements, --shares, or --prices"
                );
                return Ok(());
            }

            let store = open_store(store.as_deref())?;

            if let Some(path) = securities {
                let count = with_spinner("Importing securities...", || {
                    importer::import_securities(&store, &path)
                })?;
                println!("Imported {} securities", count);
            }
            if let Some(path) = statements {
                let count = with_spinner("Importing statements...", || {
                    importer::import_statements(&store, &path)
                })?;
                println!("Imported {} statements", count);
            }
            if let Some(path) = shares {
                let count = with_spinner("Importing shares records...", || {
                    importer::import_shares(&store, &path)
                })?;
                println!("Imported {} shares records", count);
            }
            if let Some(path) = prices {
                let count = with_spinner("Importing prices...", || {
                    importer::import_prices(&store, &path)
                })?;
                println!("Imported {} prices", count);
            }
        }
        Commands::Export {
            format,
            output,
            symbol,
            warehouse,
        } => {
            let format: ExportFormat = format.parse()?;
            let warehouse = open_warehouse(warehouse.as_deref())?;
            let rows = warehouse.fetch_rows(symbol.as_deref())?;

            if rows.is_empty() {
                println!("No rows to export");
                return Ok(());
            }

            match output {
                Some(path) => {
                    rows.export_to_file(&path, format)?;
                    println!("Exported {} rows to {}", rows.len(), path.display());
                }
                None => print!("{}", rows.export_to_string(format)?),
            }
        }
        Commands::Stats { store, warehouse } => {
            let store = open_store(store.as_deref())?;
            let stats = store.get_stats()?;

            println!("Operational store");
            println!("  Securities:     {}", stats.securities);
            println!("  Statements:     {}", stats.statements);
            println!("  Shares records: {}", stats.shares_records);
            println!("  Prices:         {}", stats.prices);
            println!("  Metric rows:    {}", stats.metric_rows);

            let warehouse = open_warehouse(warehouse.as_deref())?;
            match warehouse.get_stats() {
                Ok(stats) => {
                    println!("\nAnalytical warehouse");
                    println!("  Metric rows:    {}", stats.metric_rows);
                    println!("  Securities:     {}", stats.securities);
                    if let (Some(earliest), Some(latest)) = (stats.earliest_date, stats.latest_date)
                    {
                        println!("  Date range:     {}..{}", earliest, latest);
                    }
                }
                Err(_) => println!("\nAnalytical warehouse: empty (no metrics table yet)"),
            }
        }
    }

    Ok(())
}

/// Run `op` under a steady-tick spinner, finishing it either way.
fn with_spinner<T, E>(message: &'static str, op: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));
    pb.set_message(message);

    let result = op();
    match &result {
        Ok(_) => pb.finish_with_message(format!("{} done", message)),
        Err(_) => pb.finish_with_message(format!("{} failed", message)),
    }
    result
}
