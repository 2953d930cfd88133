//! Derived metric series construction for one security.
//!
//! Walks a security's daily price history in date order, resolves the
//! fundamentals effective on each trading day through the as-of cursor,
//! and emits one [`DerivedMetricRow`] per derivable day. Trading days
//! before the first effective statement (or shares record) produce no row.

use chrono::{DateTime, Utc};
use hobart_data::types::{
    DerivedMetricRow, Listing, PriceObservation, Security, SharesRecord, StatementPeriod,
};

use crate::asof::AsOfJoiner;
use crate::ttm::{self, TTM_WINDOW};

/// Build the derived metric series for one security.
///
/// `statements`, `shares_records`, and `prices` must each be sorted
/// ascending by date. Domestic securities derive from `statements`;
/// foreign securities derive market cap from `shares_records` and carry no
/// ratios. Every emitted row is stamped with the same `computed_at`.
#[must_use]
pub fn build_series(
    security: &Security,
    statements: &[StatementPeriod],
    shares_records: &[SharesRecord],
    prices: &[PriceObservation],
    computed_at: DateTime<Utc>,
) -> Vec<DerivedMetricRow> {
    match security.listing {
        Listing::Domestic => domestic_series(security, statements, prices, computed_at),
        Listing::Foreign => foreign_series(security, shares_records, prices, computed_at),
    }
}

fn domestic_series(
    security: &Security,
    statements: &[StatementPeriod],
    prices: &[PriceObservation],
    computed_at: DateTime<Utc>,
) -> Vec<DerivedMetricRow> {
    let mut joiner = AsOfJoiner::new(statements);
    let mut rows = Vec::with_capacity(prices.len());

    for price in prices {
        let Some(index) = joiner.advance(price.date) else {
            continue;
        };
        let window = joiner.window(index, TTM_WINDOW);
        let Some(valuation) = ttm::aggregate(window, price.close) else {
            continue;
        };

        rows.push(DerivedMetricRow {
            security_id: security.id.clone(),
            symbol: security.symbol.clone(),
            date: price.date,
            price: price.close,
            volume: price.volume,
            market_cap: valuation.market_cap,
            pe_ratio_ttm: valuation.pe_ratio_ttm,
            ps_ratio_ttm: valuation.ps_ratio_ttm,
            pb_ratio: valuation.pb_ratio,
            enterprise_value: valuation.enterprise_value,
            listing: Listing::Domestic,
            computed_at,
        });
    }

    rows
}

fn foreign_series(
    security: &Security,
    shares_records: &[SharesRecord],
    prices: &[PriceObservation],
    computed_at: DateTime<Utc>,
) -> Vec<DerivedMetricRow> {
    let mut joiner = AsOfJoiner::new(shares_records);
    let mut rows = Vec::with_capacity(prices.len());

    for price in prices {
        let Some(record) = joiner.as_of(price.date) else {
            continue;
        };

        rows.push(DerivedMetricRow {
            security_id: security.id.clone(),
            symbol: security.symbol.clone(),
            date: price.date,
            price: price.close,
            volume: price.volume,
            market_cap: price.close * record.shares_outstanding,
            pe_ratio_ttm: None,
            ps_ratio_ttm: None,
            pb_ratio: None,
            enterprise_value: None,
            listing: Listing::Foreign,
            computed_at,
        });
    }

    rows
}
