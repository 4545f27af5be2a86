//! Feeding periods: when a room was on a given feed type.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use farmledger_core::{FeedTypeId, RoomId};
use farmledger_ledger::DateRange;

use crate::feed::RoomFeedingChange;

/// Effective feed type per change date for one room.
///
/// When a room has several changes on the same day the last recorded one wins.
fn schedule<'a>(
    changes: impl IntoIterator<Item = &'a RoomFeedingChange>,
    room: RoomId,
) -> BTreeMap<NaiveDate, FeedTypeId> {
    changes
        .into_iter()
        .filter(|c| c.room == room)
        .map(|c| (c.date, c.feed_type))
        .collect()
}

/// Feed type `room` is on at `at`, if any was ever assigned.
pub fn feed_type_at<'a>(
    changes: impl IntoIterator<Item = &'a RoomFeedingChange>,
    room: RoomId,
    at: NaiveDate,
) -> Option<FeedTypeId> {
    schedule(changes, room)
        .range(..=at)
        .next_back()
        .map(|(_, feed_type)| *feed_type)
}

/// Maximal `[start, end)` ranges within `window` during which `room` was fed
/// `feed_type`, in chronological order.
///
/// Repeated assignments of the same type extend a period; the first change
/// to another type closes it. A period still open at the window end is cut
/// there.
pub fn feeding_periods<'a>(
    changes: impl IntoIterator<Item = &'a RoomFeedingChange>,
    room: RoomId,
    window: &DateRange,
    feed_type: FeedTypeId,
) -> Vec<DateRange> {
    let mut periods = Vec::new();
    if window.is_empty() {
        return periods;
    }

    let schedule = schedule(changes, room);
    let initial = schedule.range(..=window.start).next_back().map(|(_, t)| *t);
    let mut open = (initial == Some(feed_type)).then_some(window.start);

    for (&date, &assigned) in schedule.range(window.start..window.end) {
        if date == window.start {
            continue;
        }
        match open {
            None if assigned == feed_type => open = Some(date),
            Some(start) if assigned != feed_type => {
                periods.push(DateRange { start, end: date });
                open = None;
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        periods.push(DateRange {
            start,
            end: window.end,
        });
    }
    periods
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use proptest::prelude::*;

    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 3, day).unwrap()
    }

    fn window(start: u32, end: u32) -> DateRange {
        DateRange::new(d(start), d(end)).unwrap()
    }

    struct Feeds {
        room: RoomId,
        starter: FeedTypeId,
        grower: FeedTypeId,
    }

    fn feeds() -> Feeds {
        Feeds {
            room: RoomId::new(),
            starter: FeedTypeId::new(),
            grower: FeedTypeId::new(),
        }
    }

    #[test]
    fn type_active_before_window_opens_a_period_at_its_start() {
        let f = feeds();
        let changes = [
            RoomFeedingChange::new(d(1), f.room, f.starter),
            RoomFeedingChange::new(d(10), f.room, f.grower),
        ];
        assert_eq!(
            feeding_periods(&changes, f.room, &window(5, 20), f.starter),
            vec![window(5, 10)]
        );
        assert_eq!(
            feeding_periods(&changes, f.room, &window(5, 20), f.grower),
            vec![window(10, 20)]
        );
    }

    #[test]
    fn repeated_assignments_extend_a_period() {
        let f = feeds();
        let changes = [
            RoomFeedingChange::new(d(2), f.room, f.starter),
            RoomFeedingChange::new(d(6), f.room, f.starter),
            RoomFeedingChange::new(d(8), f.room, f.grower),
            RoomFeedingChange::new(d(12), f.room, f.starter),
        ];
        assert_eq!(
            feeding_periods(&changes, f.room, &window(1, 15), f.starter),
            vec![window(2, 8), window(12, 15)]
        );
    }

    #[test]
    fn other_rooms_and_empty_windows_yield_nothing() {
        let f = feeds();
        let changes = [RoomFeedingChange::new(d(2), RoomId::new(), f.starter)];
        assert!(feeding_periods(&changes, f.room, &window(1, 15), f.starter).is_empty());

        let own = [RoomFeedingChange::new(d(2), f.room, f.starter)];
        assert!(feeding_periods(&own, f.room, &window(5, 5), f.starter).is_empty());
    }

    #[test]
    fn feed_type_at_takes_latest_change() {
        let f = feeds();
        let changes = [
            RoomFeedingChange::new(d(2), f.room, f.starter),
            RoomFeedingChange::new(d(8), f.room, f.grower),
        ];
        assert_eq!(feed_type_at(&changes, f.room, d(1)), None);
        assert_eq!(feed_type_at(&changes, f.room, d(7)), Some(f.starter));
        assert_eq!(feed_type_at(&changes, f.room, d(8)), Some(f.grower));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Periods are ordered, disjoint and never leave the query window.
        #[test]
        fn periods_stay_inside_window(
            raw in proptest::collection::vec((0u64..60, any::<bool>()), 0..20),
            start in 0u64..60,
            len in 0u64..60,
        ) {
            let f = feeds();
            let base = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
            let at = |offset: u64| base.checked_add_days(Days::new(offset)).unwrap();
            let changes: Vec<_> = raw
                .iter()
                .map(|(offset, starter)| {
                    let feed = if *starter { f.starter } else { f.grower };
                    RoomFeedingChange::new(at(*offset), f.room, feed)
                })
                .collect();
            let window = DateRange::new(at(start), at(start + len)).unwrap();

            let periods = feeding_periods(&changes, f.room, &window, f.starter);
            for p in &periods {
                prop_assert!(p.start >= window.start);
                prop_assert!(p.end <= window.end);
                prop_assert!(p.start < p.end);
            }
            for pair in periods.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }
        }
    }
}
