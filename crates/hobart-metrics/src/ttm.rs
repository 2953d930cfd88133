//! Trailing-twelve-month aggregation and valuation ratios.
//!
//! Flow fields (revenue, net income) are summed over the trailing window
//! and scaled onto a full year when fewer than four quarters are
//! available. Balance-sheet fields (equity, debt, cash) are taken from the
//! latest statement only. Every ratio is guarded on a strictly positive
//! denominator; an unguardable ratio is absent, never zero or infinite.

use hobart_data::types::{StatementField, StatementPeriod};

/// Number of quarterly periods in a full trailing-twelve-month window.
pub const TTM_WINDOW: usize = 4;

/// Balance-sheet fields that make enterprise value reportable when any one
/// of them is present on the latest statement.
const EV_SOURCE_FIELDS: [StatementField; 5] = [
    StatementField::TotalDebt,
    StatementField::ShortTermDebt,
    StatementField::LongTermDebt,
    StatementField::CashAndEquivalents,
    StatementField::ShortTermInvestments,
];

/// Valuation metrics derived from one close price against a statement
/// window.
#[derive(Debug, Clone, PartialEq)]
pub struct TtmValuation {
    /// Price times shares outstanding from the latest statement.
    pub market_cap: f64,
    /// Market cap over annualized trailing net income.
    pub pe_ratio_ttm: Option<f64>,
    /// Market cap over annualized trailing revenue.
    pub ps_ratio_ttm: Option<f64>,
    /// Market cap over latest stockholders equity.
    pub pb_ratio: Option<f64>,
    /// Market cap plus total debt minus cash and short-term investments.
    pub enterprise_value: Option<f64>,
}

/// Aggregate a trailing statement window (ascending, most recent last)
/// against a close price.
///
/// Returns `None` for an empty window; with at least one statement a
/// valuation is always produced, even if every ratio in it is absent.
#[must_use]
pub fn aggregate(window: &[StatementPeriod], price: f64) -> Option<TtmValuation> {
    let latest = window.last()?;
    let scale = scale_factor(window.len());

    let ttm_net_income = scale * window_sum(window, StatementField::NetIncome);
    let ttm_revenue = scale * window_sum(window, StatementField::Revenue);
    let market_cap = price * latest.shares_outstanding;

    Some(TtmValuation {
        market_cap,
        pe_ratio_ttm: positive_ratio(market_cap, ttm_net_income),
        ps_ratio_ttm: positive_ratio(market_cap, ttm_revenue),
        pb_ratio: latest
            .field(StatementField::StockholdersEquity)
            .and_then(|equity| positive_ratio(market_cap, equity)),
        enterprise_value: enterprise_value(latest, market_cap),
    })
}

/// Scale factor that projects `count` available quarters onto a full year.
fn scale_factor(count: usize) -> f64 {
    TTM_WINDOW as f64 / count as f64
}

/// Sum a flow field over the window; a statement that did not report the
/// field contributes zero.
fn window_sum(window: &[StatementPeriod], field: StatementField) -> f64 {
    window.iter().map(|s| s.field(field).unwrap_or(0.0)).sum()
}

/// Ratio guarded on a strictly positive denominator.
fn positive_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then_some(numerator / denominator)
}

/// Enterprise value from the latest statement.
///
/// Absent unless at least one debt or cash field is reported. A reported
/// total debt takes precedence; otherwise short-term and long-term debt
/// are summed with absent components as zero. Cash is cash equivalents
/// plus short-term investments, also zero-defaulted.
fn enterprise_value(latest: &StatementPeriod, market_cap: f64) -> Option<f64> {
    if !EV_SOURCE_FIELDS.iter().any(|f| latest.field(*f).is_some()) {
        return None;
    }

    let total_debt = latest.field(StatementField::TotalDebt).unwrap_or_else(|| {
        latest.field(StatementField::ShortTermDebt).unwrap_or(0.0)
            + latest.field(StatementField::LongTermDebt).unwrap_or(0.0)
    });
    let cash = latest.field(StatementField::CashAndEquivalents).unwrap_or(0.0)
        + latest.field(StatementField::ShortTermInvestments).unwrap_or(0.0);

    Some(market_cap + total_debt - cash)
}
