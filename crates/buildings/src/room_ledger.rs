//! Room-scoped occupancy queries.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use farmledger_core::{DomainError, DomainResult, FlockId, RoomId};
use farmledger_ledger::{DateRange, OccupancyLedger};

use crate::movement::{AnimalRoomEntry, AnimalRoomExit};

/// Entries and exits of a single room, with the derived occupancy ledger.
#[derive(Debug, Clone)]
pub struct RoomLedger {
    room: RoomId,
    entries: Vec<AnimalRoomEntry>,
    exits: Vec<AnimalRoomExit>,
    ledger: OccupancyLedger,
}

impl RoomLedger {
    /// Build the ledger for `room`; movements of other rooms are ignored.
    pub fn new(
        room: RoomId,
        entries: impl IntoIterator<Item = AnimalRoomEntry>,
        exits: impl IntoIterator<Item = AnimalRoomExit>,
    ) -> Self {
        let entries: Vec<_> = entries.into_iter().filter(|e| e.room == room).collect();
        let exits: Vec<_> = exits.into_iter().filter(|e| e.room == room).collect();

        let mut ledger = OccupancyLedger::from_movements(&entries);
        ledger.extend(&exits);

        Self {
            room,
            entries,
            exits,
            ledger,
        }
    }

    pub fn room(&self) -> RoomId {
        self.room
    }

    pub fn entries(&self) -> &[AnimalRoomEntry] {
        &self.entries
    }

    pub fn exits(&self) -> &[AnimalRoomExit] {
        &self.exits
    }

    pub fn occupancy_at(&self, at: NaiveDate) -> i64 {
        self.ledger.occupancy_at(at)
    }

    pub fn transitions(&self, start: NaiveDate, end: NaiveDate) -> BTreeMap<NaiveDate, i64> {
        self.ledger.transitions(start, end)
    }

    pub fn animal_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        self.ledger.animal_days(start, end)
    }

    pub fn animal_days_in(&self, range: &DateRange) -> i64 {
        self.ledger.animal_days_in(range)
    }

    /// Head count of one flock in this room at `at`.
    pub fn animals_for_flock(&self, flock: FlockId, at: NaiveDate) -> i64 {
        let entered: i64 = self
            .entries
            .iter()
            .filter(|e| e.flock == flock && e.date <= at)
            .map(|e| e.number_of_animals)
            .sum();
        let exited: i64 = self
            .exits
            .iter()
            .filter(|e| e.flock == flock && e.date <= at)
            .map(|e| e.number_of_animals)
            .sum();
        entered - exited
    }

    /// Flocks with a positive head count in this room at `at`.
    pub fn flocks_present_at(&self, at: NaiveDate) -> BTreeMap<FlockId, i64> {
        let mut flocks: BTreeMap<FlockId, i64> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| e.date <= at) {
            *flocks.entry(entry.flock).or_default() += entry.number_of_animals;
        }
        for exit in self.exits.iter().filter(|e| e.date <= at) {
            *flocks.entry(exit.flock).or_default() -= exit.number_of_animals;
        }
        flocks.retain(|_, count| *count > 0);
        flocks
    }

    /// The only flock present at `at`.
    ///
    /// Rooms holding several flocks cannot be auto-assigned; the caller must
    /// name the flock explicitly.
    pub fn single_flock_at(&self, at: NaiveDate) -> DomainResult<FlockId> {
        let present = self.flocks_present_at(at);
        let mut flocks = present.keys();
        match (flocks.next(), flocks.next()) {
            (Some(flock), None) => Ok(*flock),
            (None, _) => Err(DomainError::conflict(format!(
                "room was empty on {at}"
            ))),
            (Some(_), Some(_)) => Err(DomainError::conflict(format!(
                "room had multiple flocks on {at}, cannot auto-assign"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct Setup {
        room: RoomId,
        flock1: FlockId,
        flock2: FlockId,
        ledger: RoomLedger,
    }

    /// A separation room receiving one animal from each of two flocks.
    fn separation_room() -> Setup {
        let room = RoomId::new();
        let flock1 = FlockId::new();
        let flock2 = FlockId::new();
        let entries = vec![
            AnimalRoomEntry::new(d(2016, 12, 15), 1, flock1, room).unwrap(),
            AnimalRoomEntry::new(d(2017, 1, 15), 1, flock2, room).unwrap(),
            AnimalRoomEntry::new(d(2017, 1, 15), 1, flock2, RoomId::new()).unwrap(),
        ];
        let exits = vec![AnimalRoomExit::new(d(2017, 2, 1), room, 1, flock1).unwrap()];
        Setup {
            room,
            flock1,
            flock2,
            ledger: RoomLedger::new(room, entries, exits),
        }
    }

    #[test]
    fn movements_of_other_rooms_are_ignored() {
        let s = separation_room();
        assert_eq!(s.ledger.room(), s.room);
        assert_eq!(s.ledger.entries().len(), 2);
        assert_eq!(s.ledger.occupancy_at(d(2017, 1, 20)), 2);
    }

    #[test]
    fn flocks_present_track_each_flock() {
        let s = separation_room();
        let present = s.ledger.flocks_present_at(d(2017, 1, 20));
        assert_eq!(present.len(), 2);
        assert_eq!(s.ledger.animals_for_flock(s.flock1, d(2017, 1, 20)), 1);

        let later = s.ledger.flocks_present_at(d(2017, 2, 1));
        assert_eq!(later.keys().copied().collect::<Vec<_>>(), vec![s.flock2]);
    }

    #[test]
    fn single_flock_requires_exactly_one() {
        let s = separation_room();
        assert_eq!(s.ledger.single_flock_at(d(2016, 12, 20)).unwrap(), s.flock1);
        assert!(s.ledger.single_flock_at(d(2017, 1, 20)).is_err());
        assert!(s.ledger.single_flock_at(d(2016, 1, 1)).is_err());
    }

    #[test]
    fn animal_days_use_room_movements() {
        let s = separation_room();
        // 1 animal from Dec 15 to Jan 15 (31 days), 2 animals until Feb 1 (17 days).
        assert_eq!(s.ledger.animal_days(d(2016, 12, 15), d(2017, 2, 1)), 31 + 34);
    }
}
