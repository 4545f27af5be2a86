//! Derived, read-only queries over one farm snapshot.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use farmledger_buildings::{Layout, Room, RoomLedger};
use farmledger_core::{
    BuildingId, DomainError, DomainResult, FeedTypeId, FlockId, MedicineId, RoomGroupId, RoomId,
    TreatmentId,
};
use farmledger_feeding::{FeedInventory, FeedType, suggested_feed_type};
use farmledger_flocks::{Flock, FlockPopulation, estimated_weight, expected_exit_date, weighted_growth};
use farmledger_medications::{Medicine, Treatment, availability};

use crate::config::FarmConfig;
use crate::store::FarmData;

/// A snapshot plus the configuration needed to interpret it.
#[derive(Debug, Clone, Copy)]
pub struct FarmView<'a> {
    data: &'a FarmData,
    config: &'a FarmConfig,
}

impl<'a> FarmView<'a> {
    pub fn new(data: &'a FarmData, config: &'a FarmConfig) -> Self {
        Self { data, config }
    }

    pub fn data(&self) -> &'a FarmData {
        self.data
    }

    pub fn config(&self) -> &'a FarmConfig {
        self.config
    }

    pub fn layout(&self) -> Layout<'a> {
        Layout::new(&self.data.room_groups, &self.data.rooms)
    }

    pub fn room(&self, id: RoomId) -> DomainResult<&'a Room> {
        self.data
            .rooms
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| DomainError::not_found(format!("room {id}")))
    }

    pub fn flock(&self, id: FlockId) -> DomainResult<&'a Flock> {
        self.data
            .flocks
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| DomainError::not_found(format!("flock {id}")))
    }

    pub fn room_ledger(&self, room: RoomId) -> RoomLedger {
        RoomLedger::new(
            room,
            self.data.room_entries.iter().cloned(),
            self.data.room_exits.iter().cloned(),
        )
    }

    pub fn occupancy(&self, room: RoomId, at: NaiveDate) -> i64 {
        self.room_ledger(room).occupancy_at(at)
    }

    /// Head count of a group (building or sub-group) including nested groups.
    pub fn group_occupancy(&self, group: RoomGroupId, at: NaiveDate) -> i64 {
        self.layout().occupancy(group, |room| self.occupancy(room.id, at))
    }

    pub fn population(&self, flock: &'a Flock) -> FlockPopulation<'a> {
        FlockPopulation::new(
            flock,
            &self.data.deaths,
            &self.data.flock_exits,
            &self.data.separations,
        )
    }

    /// Flocks with animals left on the farm.
    pub fn current_flocks(&self) -> Vec<FlockPopulation<'a>> {
        self.data
            .flocks
            .iter()
            .map(|f| self.population(f))
            .filter(|p| p.living_animals() > 0)
            .collect()
    }

    /// Animal-weighted growth of all flock exits dated on or after `since`
    /// (and not after `until`).
    pub fn historic_growth(&self, since: NaiveDate, until: NaiveDate) -> Option<f64> {
        let samples = self
            .data
            .flock_exits
            .iter()
            .filter(|e| e.date >= since && e.date <= until)
            .filter_map(|e| {
                let flock = self.data.flocks.iter().find(|f| f.id == e.flock)?;
                e.growth_rate(flock).map(|g| (g, e.number_of_animals))
            });
        weighted_growth(samples)
    }

    /// Growth learnt from the exits in the history window before the entry.
    pub fn growth_before_entry(&self, flock: &Flock) -> Option<f64> {
        let since = flock
            .entry_date
            .checked_sub_days(Days::new(self.config.growth.history_days))
            .unwrap_or(NaiveDate::MIN);
        self.historic_growth(since, NaiveDate::MAX)
    }

    pub fn expected_exit_date(&self, flock: &Flock) -> NaiveDate {
        expected_exit_date(flock, self.growth_before_entry(flock), &self.config.growth)
    }

    pub fn estimated_weight(&self, flock: &Flock, at: NaiveDate) -> f64 {
        estimated_weight(flock, at, self.growth_before_entry(flock), &self.config.growth)
    }

    pub fn suggested_feed_type(&self, flock: &Flock, at: NaiveDate) -> Option<&'a FeedType> {
        suggested_feed_type(
            &self.data.feed_types,
            flock.entry_date,
            self.expected_exit_date(flock),
            at,
        )
    }

    /// Ledgers of every room inside `building`.
    pub fn building_rooms(&self, building: BuildingId) -> Vec<RoomLedger> {
        self.layout()
            .rooms_in(building)
            .into_iter()
            .map(|room| self.room_ledger(room.id))
            .collect()
    }

    /// Feed estimator for one building and type. `rooms` must come from
    /// [`FarmView::building_rooms`] for the same building.
    pub fn feed_inventory<'r>(
        &self,
        building: BuildingId,
        feed_type: FeedTypeId,
        rooms: &'r [RoomLedger],
    ) -> FeedInventory<'r>
    where
        'a: 'r,
    {
        FeedInventory::new(
            feed_type,
            self.data.silos.iter().filter(move |s| s.building == building),
            &self.data.feed_deliveries,
            rooms,
            &self.data.feeding_changes,
            self.config.consumption_window_days,
        )
    }

    /// Flocks with a positive head count in `room` at `at`.
    pub fn flocks_present(&self, room: RoomId, at: NaiveDate) -> BTreeMap<FlockId, i64> {
        self.room_ledger(room).flocks_present_at(at)
    }

    pub fn medicine(&self, id: MedicineId) -> DomainResult<&'a Medicine> {
        self.data
            .medicines
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| DomainError::not_found(format!("medicine {id}")))
    }

    pub fn treatment(&self, id: TreatmentId) -> DomainResult<&'a Treatment> {
        self.data
            .treatments
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| DomainError::not_found(format!("treatment {id}")))
    }

    /// Quantity of `medicine` in stock.
    pub fn medicine_availability(&self, medicine: MedicineId) -> f64 {
        availability(
            medicine,
            &self.data.medicine_entries,
            &self.data.medicine_discards,
            &self.data.treatments,
            &self.data.applications,
        )
    }
}
