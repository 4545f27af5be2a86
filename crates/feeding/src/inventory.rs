//! Feed stock estimation for one building and feed type.

use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use farmledger_buildings::{RoomLedger, Silo};
use farmledger_core::{BuildingId, FeedTypeId, SiloId};
use farmledger_ledger::DateRange;

use crate::feed::{FeedDelivery, RoomFeedingChange};
use crate::periods::{feed_type_at, feeding_periods};

/// All deliveries of one day for a building and feed type, merged.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPoint {
    pub date: NaiveDate,
    pub weight: f64,
    pub remaining: f64,
}

impl DeliveryPoint {
    pub fn stock(&self) -> f64 {
        self.weight + self.remaining
    }
}

/// Total silo capacity of `building` for `feed_type` (kg).
pub fn feed_capacity<'a>(
    silos: impl IntoIterator<Item = &'a Silo>,
    building: BuildingId,
    feed_type: FeedTypeId,
) -> f64 {
    silos
        .into_iter()
        .filter(|s| s.building == building && s.feed_type == feed_type)
        .map(|s| s.capacity)
        .sum()
}

/// Stock estimator for one feed type in one building.
///
/// The average consumption per animal-day is learnt from consecutive
/// deliveries: what was delivered and found at one delivery, minus what was
/// found at the next, was eaten by the animals fed this type in between.
#[derive(Debug)]
pub struct FeedInventory<'a> {
    feed_type: FeedTypeId,
    deliveries: Vec<DeliveryPoint>,
    rooms: Vec<&'a RoomLedger>,
    changes: &'a [RoomFeedingChange],
    window_days: u64,
}

impl<'a> FeedInventory<'a> {
    /// `silos` and `rooms` must be those of the building; deliveries into
    /// other silos, or of another feed type, are ignored.
    pub fn new(
        feed_type: FeedTypeId,
        silos: impl IntoIterator<Item = &'a Silo>,
        deliveries: impl IntoIterator<Item = &'a FeedDelivery>,
        rooms: impl IntoIterator<Item = &'a RoomLedger>,
        changes: &'a [RoomFeedingChange],
        window_days: u64,
    ) -> Self {
        let silos: HashSet<SiloId> = silos
            .into_iter()
            .filter(|s| s.feed_type == feed_type)
            .map(|s| s.id)
            .collect();

        let mut merged: BTreeMap<NaiveDate, DeliveryPoint> = BTreeMap::new();
        for delivery in deliveries
            .into_iter()
            .filter(|d| d.feed_type == feed_type && silos.contains(&d.silo))
        {
            let point = merged.entry(delivery.date).or_insert(DeliveryPoint {
                date: delivery.date,
                weight: 0.0,
                remaining: 0.0,
            });
            point.weight += delivery.weight;
            point.remaining += delivery.remaining;
        }

        Self {
            feed_type,
            deliveries: merged.into_values().collect(),
            rooms: rooms.into_iter().collect(),
            changes,
            window_days,
        }
    }

    pub fn feed_type(&self) -> FeedTypeId {
        self.feed_type
    }

    /// Merged deliveries in date order.
    pub fn deliveries(&self) -> &[DeliveryPoint] {
        &self.deliveries
    }

    /// Animal-days fed this type within `range`, over all rooms.
    pub fn consumption_days(&self, range: &DateRange) -> i64 {
        self.rooms
            .iter()
            .map(|room| {
                feeding_periods(self.changes, room.room(), range, self.feed_type)
                    .iter()
                    .map(|period| room.animal_days_in(period))
                    .sum::<i64>()
            })
            .sum()
    }

    /// Animals on this feed type at `at`.
    pub fn current_consumers(&self, at: NaiveDate) -> i64 {
        self.rooms
            .iter()
            .filter(|room| feed_type_at(self.changes, room.room(), at) == Some(self.feed_type))
            .map(|room| room.occupancy_at(at).max(0))
            .sum()
    }

    /// Mean consumption per animal-day over the trailing window ending at `at`.
    ///
    /// Every delivery interval with animals counts once, however long it is.
    pub fn average_rate(&self, at: NaiveDate) -> Option<f64> {
        let from = at
            .checked_sub_days(Days::new(self.window_days))
            .unwrap_or(NaiveDate::MIN);
        let recent: Vec<_> = self
            .deliveries
            .iter()
            .filter(|d| d.date >= from && d.date <= at)
            .collect();

        let rates: Vec<f64> = recent
            .windows(2)
            .filter_map(|pair| {
                let (prev, next) = (pair[0], pair[1]);
                let animal_days = self.consumption_days(&DateRange {
                    start: prev.date,
                    end: next.date,
                });
                (animal_days > 0).then(|| (prev.stock() - next.remaining) / animal_days as f64)
            })
            .collect();

        (!rates.is_empty()).then(|| rates.iter().sum::<f64>() / rates.len() as f64)
    }

    fn last_delivery(&self, at: NaiveDate) -> Option<&DeliveryPoint> {
        self.deliveries.iter().rev().find(|d| d.date <= at)
    }

    /// Estimated stock at `at` (kg); `None` before the first delivery.
    pub fn remaining_at(&self, at: NaiveDate) -> Option<f64> {
        let last = self.last_delivery(at)?;
        let consumed = match self.average_rate(at) {
            Some(rate) => {
                let animal_days = self.consumption_days(&DateRange {
                    start: last.date,
                    end: at,
                });
                animal_days as f64 * rate
            }
            None => 0.0,
        };
        Some((last.stock() - consumed).max(0.0))
    }

    /// Day the stock is expected to run out, at the current consumption.
    ///
    /// `None` when nothing is known to be eaten.
    pub fn depletion_date(&self, at: NaiveDate) -> Option<NaiveDate> {
        let remaining = self.remaining_at(at)?;
        let rate = self.average_rate(at).filter(|r| *r > 0.0)?;
        let consumers = self.current_consumers(at);
        if consumers <= 0 {
            return None;
        }
        let days = (remaining / (rate * consumers as f64)).floor();
        if !days.is_finite() || days < 0.0 {
            return None;
        }
        at.checked_add_days(Days::new(days as u64))
    }
}

#[cfg(test)]
mod tests {
    use farmledger_buildings::{AnimalRoomEntry, AnimalRoomExit};
    use farmledger_core::{FlockId, RoomId};
    use proptest::prelude::*;

    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 3, day).unwrap()
    }

    struct Barn {
        building: BuildingId,
        feed: FeedTypeId,
        silo: Silo,
        room: RoomLedger,
        changes: Vec<RoomFeedingChange>,
    }

    /// 10 animals from March 1st, fed one type all along.
    fn barn() -> Barn {
        let building = BuildingId::new();
        let feed = FeedTypeId::new();
        let silo = Silo::new("S1", 20_000.0, building, feed).unwrap();
        let room = RoomId::new();
        let flock = FlockId::new();
        let entries = [AnimalRoomEntry::new(d(1), 10, flock, room).unwrap()];
        Barn {
            building,
            feed,
            silo,
            room: RoomLedger::new(room, entries, Vec::<AnimalRoomExit>::new()),
            changes: vec![RoomFeedingChange::new(d(1), room, feed)],
        }
    }

    fn delivery(barn: &Barn, day: u32, weight: f64, remaining: f64) -> FeedDelivery {
        FeedDelivery::new(d(day), barn.silo.id, barn.feed, weight, remaining).unwrap()
    }

    fn inventory<'a>(barn: &'a Barn, deliveries: &'a [FeedDelivery]) -> FeedInventory<'a> {
        FeedInventory::new(
            barn.feed,
            [&barn.silo],
            deliveries,
            [&barn.room],
            &barn.changes,
            365,
        )
    }

    #[test]
    fn rate_remaining_and_depletion() {
        let barn = barn();
        // 1000 kg eaten over 10 days by 10 animals: 10 kg per animal-day.
        let deliveries = [delivery(&barn, 1, 1500.0, 0.0), delivery(&barn, 11, 2000.0, 500.0)];
        let inv = inventory(&barn, &deliveries);

        assert_eq!(inv.consumption_days(&DateRange { start: d(1), end: d(11) }), 100);
        assert!((inv.average_rate(d(15)).unwrap() - 10.0).abs() < 1e-9);
        // 2500 kg at the 11th, 4 days x 10 animals x 10 kg eaten since.
        assert!((inv.remaining_at(d(15)).unwrap() - 2100.0).abs() < 1e-9);
        // 2100 / 100 per day = 21 days.
        assert_eq!(inv.depletion_date(d(15)), Some(d(15) + Days::new(21)));
    }

    #[test]
    fn remaining_never_goes_negative() {
        let barn = barn();
        let deliveries = [delivery(&barn, 1, 1500.0, 0.0), delivery(&barn, 11, 100.0, 500.0)];
        let inv = inventory(&barn, &deliveries);
        assert_eq!(inv.remaining_at(d(31)), Some(0.0));
        assert_eq!(inv.depletion_date(d(31)), Some(d(31)));
    }

    #[test]
    fn same_day_deliveries_merge() {
        let barn = barn();
        let deliveries = [delivery(&barn, 1, 500.0, 100.0), delivery(&barn, 1, 700.0, 200.0)];
        let inv = inventory(&barn, &deliveries);
        assert_eq!(
            inv.deliveries(),
            &[DeliveryPoint { date: d(1), weight: 1200.0, remaining: 300.0 }]
        );
        // Single delivery: no rate yet, nothing consumed.
        assert_eq!(inv.average_rate(d(5)), None);
        assert_eq!(inv.remaining_at(d(5)), Some(1500.0));
        assert_eq!(inv.depletion_date(d(5)), None);
    }

    #[test]
    fn deliveries_of_other_types_or_silos_are_ignored() {
        let barn = barn();
        let other = FeedDelivery::new(d(1), SiloId::new(), barn.feed, 100.0, 0.0).unwrap();
        let wrong_type = FeedDelivery::new(d(1), barn.silo.id, FeedTypeId::new(), 100.0, 0.0).unwrap();
        let deliveries = [other, wrong_type];
        let inv = inventory(&barn, &deliveries);
        assert!(inv.deliveries().is_empty());
        assert_eq!(inv.remaining_at(d(5)), None);
    }

    #[test]
    fn capacity_sums_matching_silos() {
        let barn = barn();
        let second = Silo::new("S2", 5_000.0, barn.building, barn.feed).unwrap();
        let foreign = Silo::new("S3", 5_000.0, BuildingId::new(), barn.feed).unwrap();
        let silos = [barn.silo.clone(), second, foreign];
        assert_eq!(feed_capacity(&silos, barn.building, barn.feed), 25_000.0);
    }

    #[test]
    fn consumers_follow_room_feed_type() {
        let mut barn = barn();
        let room = barn.room.room();
        barn.changes.push(RoomFeedingChange::new(d(20), room, FeedTypeId::new()));
        let inv = inventory(&barn, &[]);
        assert_eq!(inv.current_consumers(d(10)), 10);
        assert_eq!(inv.current_consumers(d(20)), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Without animals nothing is eaten: stock stays at the last delivery.
        #[test]
        fn zero_consumption_keeps_last_stock(
            loads in proptest::collection::vec((1u32..28, 1.0f64..5000.0, 0.0f64..5000.0), 1..8),
            query in 1u32..31,
        ) {
            let barn = barn();
            let deliveries: Vec<_> = loads
                .iter()
                .map(|(day, w, r)| delivery(&barn, *day, *w, *r))
                .collect();
            let inv = FeedInventory::new(barn.feed, [&barn.silo], &deliveries, [], &barn.changes, 365);

            let expected = inv.deliveries().iter().rev().find(|p| p.date <= d(query)).map(|p| p.stock());
            match (inv.remaining_at(d(query)), expected) {
                (Some(got), Some(want)) => prop_assert!((got - want).abs() < 1e-6),
                (got, want) => prop_assert_eq!(got, want),
            }
            prop_assert_eq!(inv.depletion_date(d(query)), None);
        }
    }
}
