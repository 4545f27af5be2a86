//! Occupancy and animal-day accumulation over a movement ledger.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::movement::{LedgerLine, Movement};
use crate::range::DateRange;

/// Date-ordered ledger of head-count changes for one container (room, flock, ...).
///
/// Lines with the same date keep their insertion order; only the per-day sum
/// matters for every query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyLedger {
    lines: Vec<LedgerLine>,
}

impl OccupancyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_movements<'a, M>(movements: impl IntoIterator<Item = &'a M>) -> Self
    where
        M: Movement + 'a,
    {
        let mut ledger = Self::new();
        ledger.extend(movements);
        ledger
    }

    /// Append one movement, keeping the ledger date-ordered.
    pub fn record(&mut self, movement: &impl Movement) {
        let line = movement.line();
        let idx = self.lines.partition_point(|l| l.date <= line.date);
        self.lines.insert(idx, line);
    }

    pub fn extend<'a, M>(&mut self, movements: impl IntoIterator<Item = &'a M>)
    where
        M: Movement + 'a,
    {
        self.lines.extend(movements.into_iter().map(|m| m.line()));
        self.lines.sort_by_key(|l| l.date);
    }

    pub fn lines(&self) -> &[LedgerLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Signed running sum of every movement dated on or before `at`.
    pub fn occupancy_at(&self, at: NaiveDate) -> i64 {
        self.lines
            .iter()
            .take_while(|l| l.date <= at)
            .map(|l| l.delta)
            .sum()
    }

    /// Occupancy level at each date where it may change within `(start, end]`.
    ///
    /// Both bounds are always present: `start` carries the level inherited from
    /// before the window and `end` the level reached at the end of it. When
    /// `end <= start` only `start` is reported.
    pub fn transitions(&self, start: NaiveDate, end: NaiveDate) -> BTreeMap<NaiveDate, i64> {
        let mut level = self.occupancy_at(start);
        let mut out = BTreeMap::from([(start, level)]);
        if end <= start {
            return out;
        }

        for line in self
            .lines
            .iter()
            .skip_while(|l| l.date <= start)
            .take_while(|l| l.date <= end)
        {
            level += line.delta;
            out.insert(line.date, level);
        }

        out.insert(end, level);
        out
    }

    /// Occupancy integrated over `[start, end)`, in head × days.
    ///
    /// Zero when `end <= start`.
    pub fn animal_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end <= start {
            return 0;
        }

        let points: Vec<(NaiveDate, i64)> = self.transitions(start, end).into_iter().collect();
        points
            .windows(2)
            .map(|w| w[0].1 * (w[1].0 - w[0].0).num_days())
            .sum()
    }

    pub fn animal_days_in(&self, range: &DateRange) -> i64 {
        self.animal_days(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
    }

    fn example_ledger() -> OccupancyLedger {
        OccupancyLedger::from_movements(&[
            LedgerLine::entry(d(1), 10),
            LedgerLine::exit(d(3), 1),
            LedgerLine::exit(d(5), 1),
        ])
    }

    #[test]
    fn occupancy_follows_entries_and_exits() {
        let ledger = example_ledger();
        assert_eq!(ledger.occupancy_at(d(2)), 10);
        assert_eq!(ledger.occupancy_at(d(4)), 9);
        assert_eq!(ledger.occupancy_at(d(5)), 8);
    }

    #[test]
    fn occupancy_before_first_entry_is_zero() {
        let ledger = example_ledger();
        let before = NaiveDate::from_ymd_opt(2016, 12, 31).unwrap();
        assert_eq!(ledger.occupancy_at(before), 0);
    }

    #[test]
    fn animal_days_over_example_week() {
        assert_eq!(example_ledger().animal_days(d(1), d(7)), 54);
    }

    #[test]
    fn transitions_include_both_bounds() {
        let changes = example_ledger().transitions(d(1), d(6));
        let expected = BTreeMap::from([(d(1), 10), (d(3), 9), (d(5), 8), (d(6), 8)]);
        assert_eq!(changes, expected);
    }

    #[test]
    fn transitions_seed_level_before_first_movement() {
        let start = NaiveDate::from_ymd_opt(2016, 12, 1).unwrap();
        let changes = example_ledger().transitions(start, d(6));
        assert_eq!(changes.len(), 5);
        assert_eq!(changes[&start], 0);
        assert_eq!(changes[&d(1)], 10);
    }

    #[test]
    fn same_day_movements_collapse_into_one_transition() {
        let ledger = OccupancyLedger::from_movements(&[
            LedgerLine::entry(d(2), 5),
            LedgerLine::exit(d(2), 2),
        ]);
        let changes = ledger.transitions(d(1), d(4));
        assert_eq!(changes[&d(2)], 3);
        assert_eq!(ledger.animal_days(d(1), d(4)), 6);
    }

    #[test]
    fn record_keeps_date_order() {
        let mut ledger = OccupancyLedger::new();
        ledger.record(&LedgerLine::exit(d(5), 1));
        ledger.record(&LedgerLine::entry(d(1), 10));
        let dates: Vec<_> = ledger.lines().iter().map(|l| l.date).collect();
        assert_eq!(dates, vec![d(1), d(5)]);
    }

    #[test]
    fn empty_or_reversed_window_has_no_animal_days() {
        let ledger = example_ledger();
        assert_eq!(ledger.animal_days(d(4), d(4)), 0);
        assert_eq!(ledger.animal_days(d(6), d(2)), 0);
    }

    fn arb_ledger() -> impl Strategy<Value = Vec<LedgerLine>> {
        prop::collection::vec((0u32..60, -20i64..40), 0..30).prop_map(|raw| {
            raw.into_iter()
                .map(|(offset, delta)| LedgerLine {
                    date: d(1) + chrono::Days::new(offset as u64),
                    delta,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: once past every movement date, occupancy equals the plain sum.
        #[test]
        fn occupancy_after_all_movements_is_the_sum(lines in arb_ledger()) {
            let ledger = OccupancyLedger::from_movements(&lines);
            let expected: i64 = lines.iter().map(|l| l.delta).sum();
            prop_assert_eq!(ledger.occupancy_at(d(1) + chrono::Days::new(90)), expected);
        }

        /// Property: animal-days split at any intermediate date add up.
        #[test]
        fn animal_days_are_additive(
            lines in arb_ledger(),
            a in 0u64..70,
            b in 0u64..70,
            c in 0u64..70,
        ) {
            let mut bounds = [a, b, c];
            bounds.sort_unstable();
            let [a, b, c] = bounds.map(|o| d(1) + chrono::Days::new(o));

            let ledger = OccupancyLedger::from_movements(&lines);
            prop_assert_eq!(
                ledger.animal_days(a, c),
                ledger.animal_days(a, b) + ledger.animal_days(b, c)
            );
        }
    }
}
