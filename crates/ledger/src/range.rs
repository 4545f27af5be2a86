use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farmledger_core::{DomainError, DomainResult};

/// Half-open date range `[start, end)`.
///
/// `end` is the first day no longer covered, which makes consecutive ranges
/// share their boundary without double counting a day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::validation(format!(
                "range end {end} is before its start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Intersection with another range, `None` when they do not overlap.
    pub fn clip(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(DateRange { start, end })
    }
}
