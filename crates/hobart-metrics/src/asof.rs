//! Forward-only as-of join over effective-dated records.
//!
//! Resolves "latest record effective at or before this date" for a series
//! of non-decreasing query dates. Because both the records and the query
//! dates are sorted, the cursor visits each record at most once across a
//! security's whole price history.

use chrono::NaiveDate;
use hobart_data::types::{SharesRecord, StatementPeriod};

/// A record carrying a point-in-time effective date.
pub trait Dated {
    /// The date at which this record became effective.
    fn effective_date(&self) -> NaiveDate;
}

impl Dated for StatementPeriod {
    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }
}

impl Dated for SharesRecord {
    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }
}

/// Forward-only as-of cursor over a slice sorted ascending by effective
/// date.
///
/// [`advance`](Self::advance) must be called with non-decreasing dates; the
/// cursor never moves backwards.
#[derive(Debug)]
pub struct AsOfJoiner<'a, T> {
    records: &'a [T],
    cursor: usize,
}

impl<'a, T: Dated> AsOfJoiner<'a, T> {
    /// Create a joiner over records sorted ascending by effective date.
    #[must_use]
    pub const fn new(records: &'a [T]) -> Self {
        Self { records, cursor: 0 }
    }

    /// Advance to `date` and return the index of the latest record with an
    /// effective date at or before `date`, or `None` if no record is
    /// effective yet.
    ///
    /// A record whose effective date equals `date` is visible on `date`.
    pub fn advance(&mut self, date: NaiveDate) -> Option<usize> {
        while self.cursor < self.records.len()
            && self.records[self.cursor].effective_date() <= date
        {
            self.cursor += 1;
        }
        self.cursor.checked_sub(1)
    }

    /// Advance to `date` and return the latest effective record itself.
    pub fn as_of(&mut self, date: NaiveDate) -> Option<&'a T> {
        self.advance(date).map(|index| &self.records[index])
    }

    /// The trailing window ending at `index`, truncated to the most recent
    /// `max` records. The window is ordered ascending, most recent last.
    #[must_use]
    pub fn window(&self, index: usize, max: usize) -> &'a [T] {
        let end = index + 1;
        &self.records[end.saturating_sub(max)..end]
    }
}
