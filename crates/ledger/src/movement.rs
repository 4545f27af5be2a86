use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A dated, signed head-count change.
///
/// Entries carry a positive `delta`, exits a negative one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub date: NaiveDate,
    pub delta: i64,
}

impl LedgerLine {
    pub fn entry(date: NaiveDate, count: i64) -> Self {
        Self { date, delta: count }
    }

    pub fn exit(date: NaiveDate, count: i64) -> Self {
        Self { date, delta: -count }
    }
}

/// Anything that moves animals in or out of a container on a given day.
///
/// Movements are facts: once recorded they are only ever appended to a
/// ledger, never edited in place.
pub trait Movement {
    /// Business date of the movement.
    fn movement_date(&self) -> NaiveDate;

    /// Head-count change: positive for entries, negative for exits.
    fn signed_count(&self) -> i64;

    fn line(&self) -> LedgerLine {
        LedgerLine {
            date: self.movement_date(),
            delta: self.signed_count(),
        }
    }
}

impl Movement for LedgerLine {
    fn movement_date(&self) -> NaiveDate {
        self.date
    }

    fn signed_count(&self) -> i64 {
        self.delta
    }
}
