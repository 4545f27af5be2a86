//! Farm service: queries and registration commands over a [`FarmStore`].
//!
//! Every call takes a fresh snapshot, so queries are consistent within one
//! call. Commands validate references against that snapshot and commit a
//! [`ChangeSet`]; the store re-checks the movement ledger atomically.
//!
//! ```text
//! command
//!   ↓
//! snapshot + FarmView (validate references, build records)
//!   ↓
//! ChangeSet → FarmStore::commit (all-or-nothing)
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use farmledger_buildings::{Room, RoomGroup, Silo};
use farmledger_core::{
    BuildingId, DomainError, FarmExitId, FeedTypeId, FlockId, MedicineId, RoomEntryId, RoomExitId,
    RoomGroupId, RoomId, TreatmentId,
};
use farmledger_feeding::{FeedDelivery, FeedType, RoomFeedingChange, feed_capacity};
use farmledger_flocks::Kpi;
use farmledger_ledger::DateRange;
use farmledger_medications::{Medicine, MedicineApplication, MedicineDiscard, MedicineEntry};

use crate::config::FarmConfig;
use crate::kpis;
use crate::store::{ChangeSet, FarmData, FarmStore, Record, RecordKey, StoreError};
use crate::view::FarmView;
use crate::wizards::{Wizard, WizardError};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Entry point for everything the farm records.
#[derive(Debug)]
pub struct FarmLedger<S: FarmStore> {
    store: S,
    config: FarmConfig,
}

impl<S: FarmStore> FarmLedger<S> {
    pub fn new(store: S, config: FarmConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FarmConfig {
        &self.config
    }

    pub fn snapshot(&self) -> LedgerResult<Arc<FarmData>> {
        Ok(self.store.snapshot()?)
    }

    /// Run `f` against a view of the current snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&FarmView<'_>) -> T) -> LedgerResult<T> {
        let data = self.snapshot()?;
        Ok(f(&FarmView::new(&data, &self.config)))
    }

    fn query<T>(&self, f: impl FnOnce(&FarmView<'_>) -> Result<T, DomainError>) -> LedgerResult<T> {
        let data = self.snapshot()?;
        Ok(f(&FarmView::new(&data, &self.config))?)
    }

    // ---- queries -------------------------------------------------------

    pub fn occupancy(&self, room: RoomId, date: NaiveDate) -> LedgerResult<i64> {
        self.query(|view| {
            view.room(room)?;
            Ok(view.occupancy(room, date))
        })
    }

    /// Animal-days in `room` over `[start, end)`.
    pub fn animal_days(&self, room: RoomId, start: NaiveDate, end: NaiveDate) -> LedgerResult<i64> {
        let range = DateRange::new(start, end)?;
        self.query(|view| {
            view.room(room)?;
            Ok(view.room_ledger(room).animal_days_in(&range))
        })
    }

    pub fn feeding_periods(
        &self,
        room: RoomId,
        start: NaiveDate,
        end: NaiveDate,
        feed_type: FeedTypeId,
    ) -> LedgerResult<Vec<DateRange>> {
        let window = DateRange::new(start, end)?;
        self.query(|view| {
            view.room(room)?;
            Ok(farmledger_feeding::feeding_periods(
                &view.data().feeding_changes,
                room,
                &window,
                feed_type,
            ))
        })
    }

    /// Kg of `feed_type` eaten per animal-day in `building`, learnt from the
    /// deliveries in the consumption window before `date`.
    pub fn average_feed_consumption(
        &self,
        building: BuildingId,
        date: NaiveDate,
        feed_type: FeedTypeId,
    ) -> LedgerResult<Option<f64>> {
        self.query(|view| {
            ensure_building(view, building)?;
            let rooms = view.building_rooms(building);
            Ok(view.feed_inventory(building, feed_type, &rooms).average_rate(date))
        })
    }

    /// Estimated kg of `feed_type` left in the building's silos on `date`;
    /// `None` before the first delivery.
    pub fn remaining_feed(
        &self,
        building: BuildingId,
        date: NaiveDate,
        feed_type: FeedTypeId,
    ) -> LedgerResult<Option<f64>> {
        self.query(|view| {
            ensure_building(view, building)?;
            let rooms = view.building_rooms(building);
            let remaining = view.feed_inventory(building, feed_type, &rooms).remaining_at(date);
            debug!(%building, %feed_type, %date, ?remaining, "estimated remaining feed");
            Ok(remaining)
        })
    }

    /// First day the silos are expected to run empty, if consumption is known.
    pub fn estimated_depletion_date(
        &self,
        building: BuildingId,
        date: NaiveDate,
        feed_type: FeedTypeId,
    ) -> LedgerResult<Option<NaiveDate>> {
        self.query(|view| {
            ensure_building(view, building)?;
            let rooms = view.building_rooms(building);
            Ok(view.feed_inventory(building, feed_type, &rooms).depletion_date(date))
        })
    }

    pub fn feed_capacity(&self, building: BuildingId, feed_type: FeedTypeId) -> LedgerResult<f64> {
        self.query(|view| {
            ensure_building(view, building)?;
            Ok(feed_capacity(&view.data().silos, building, feed_type))
        })
    }

    pub fn group_occupancy(&self, group: RoomGroupId, date: NaiveDate) -> LedgerResult<i64> {
        self.query(|view| {
            view.layout()
                .group(group)
                .ok_or_else(|| DomainError::not_found(format!("room group {group}")))?;
            Ok(view.group_occupancy(group, date))
        })
    }

    pub fn flocks_present(&self, room: RoomId, date: NaiveDate) -> LedgerResult<BTreeMap<FlockId, i64>> {
        self.query(|view| {
            view.room(room)?;
            Ok(view.flocks_present(room, date))
        })
    }

    /// Animals of `flock` still on the farm (separated animals included).
    pub fn living_animals(&self, flock: FlockId) -> LedgerResult<i64> {
        self.query(|view| Ok(view.population(view.flock(flock)?).living_animals()))
    }

    pub fn expected_exit_date(&self, flock: FlockId) -> LedgerResult<NaiveDate> {
        self.query(|view| Ok(view.expected_exit_date(view.flock(flock)?)))
    }

    pub fn farm_kpis(&self, today: NaiveDate) -> LedgerResult<Vec<Kpi>> {
        self.read(|view| kpis::farm_kpis(view, today))
    }

    pub fn flock_kpis(&self, flock: FlockId, today: NaiveDate) -> LedgerResult<Vec<Kpi>> {
        self.query(|view| Ok(kpis::flock_kpis(view, view.flock(flock)?, today)))
    }

    // ---- commands ------------------------------------------------------

    pub fn register_room_group(&self, group: RoomGroup) -> LedgerResult<RoomGroupId> {
        let data = self.snapshot()?;
        let view = FarmView::new(&data, &self.config);
        if let Some(parent) = group.parent {
            view.layout()
                .group(parent)
                .ok_or_else(|| DomainError::not_found(format!("parent group {parent}")))?;
        }
        let id = group.id;
        self.commit_one("room_group", group)?;
        Ok(id)
    }

    pub fn register_room(&self, room: Room) -> LedgerResult<RoomId> {
        let data = self.snapshot()?;
        let view = FarmView::new(&data, &self.config);
        view.layout()
            .group(room.group)
            .ok_or_else(|| DomainError::not_found(format!("room group {}", room.group)))?;
        let id = room.id;
        self.commit_one("room", room)?;
        Ok(id)
    }

    pub fn register_silo(&self, silo: Silo) -> LedgerResult<()> {
        let data = self.snapshot()?;
        let view = FarmView::new(&data, &self.config);
        ensure_building(&view, silo.building)?;
        ensure_feed_type(&view, silo.feed_type)?;
        self.commit_one("silo", silo)
    }

    pub fn register_feed_type(&self, feed_type: FeedType) -> LedgerResult<FeedTypeId> {
        let data = self.snapshot()?;
        if data.feed_types.iter().any(|t| t.name == feed_type.name) {
            return Err(DomainError::conflict(format!("feed type {} already exists", feed_type.name)).into());
        }
        let id = feed_type.id;
        self.commit_one("feed_type", feed_type)?;
        Ok(id)
    }

    pub fn register_feed_delivery(&self, delivery: FeedDelivery) -> LedgerResult<()> {
        let data = self.snapshot()?;
        let silo = data
            .silos
            .iter()
            .find(|s| s.id == delivery.silo)
            .ok_or_else(|| DomainError::not_found(format!("silo {}", delivery.silo)))?;
        delivery.validate_for(silo)?;
        self.commit_one("feed_delivery", delivery)
    }

    pub fn register_feeding_change(&self, change: RoomFeedingChange) -> LedgerResult<()> {
        let data = self.snapshot()?;
        let view = FarmView::new(&data, &self.config);
        view.room(change.room)?;
        ensure_feed_type(&view, change.feed_type)?;
        self.commit_one("feeding_change", change)
    }

    pub fn register_medicine(&self, medicine: Medicine) -> LedgerResult<MedicineId> {
        medicine.validate()?;
        let data = self.snapshot()?;
        if data.medicines.iter().any(|m| m.name == medicine.name) {
            return Err(DomainError::conflict(format!("medicine {} already exists", medicine.name)).into());
        }
        let id = medicine.id;
        self.commit_one("medicine", medicine)?;
        Ok(id)
    }

    pub fn register_medicine_entry(&self, entry: MedicineEntry) -> LedgerResult<()> {
        let data = self.snapshot()?;
        FarmView::new(&data, &self.config).medicine(entry.medicine)?;
        self.commit_one("medicine_entry", entry)
    }

    /// Discards cannot exceed what is in stock.
    pub fn register_medicine_discard(&self, discard: MedicineDiscard) -> LedgerResult<()> {
        let data = self.snapshot()?;
        let view = FarmView::new(&data, &self.config);
        view.medicine(discard.medicine)?;
        ensure_available(&view, discard.medicine, discard.quantity)?;
        self.commit_one("medicine_discard", discard)
    }

    /// A further application of a running treatment.
    pub fn register_medicine_application(&self, application: MedicineApplication) -> LedgerResult<()> {
        let data = self.snapshot()?;
        let view = FarmView::new(&data, &self.config);
        let treatment = view.treatment(application.treatment)?;
        if !treatment.is_active() {
            return Err(DomainError::conflict("treatment was already stopped").into());
        }
        if application.date < treatment.start_date {
            return Err(DomainError::validation("application precedes the treatment start").into());
        }
        ensure_available(&view, treatment.medicine, application.dosage)?;
        self.commit_one("medicine_application", application)
    }

    pub fn stop_treatment(&self, treatment: TreatmentId, date: NaiveDate) -> LedgerResult<()> {
        let data = self.snapshot()?;
        let mut stopped = FarmView::new(&data, &self.config).treatment(treatment)?.clone();
        stopped.stop(date)?;
        let mut changes = ChangeSet::new();
        changes.update(stopped);
        self.store.commit(changes)?;
        info!(%treatment, %date, "treatment stopped");
        Ok(())
    }

    /// Delete a flock together with every record that refers to it.
    pub fn delete_flock(&self, flock: FlockId) -> LedgerResult<()> {
        let data = self.snapshot()?;
        FarmView::new(&data, &self.config).flock(flock)?;
        let changes = flock_cascade(&data, flock);
        let removed = changes.len();
        self.store.commit(changes)?;
        info!(%flock, removed, "flock deleted");
        Ok(())
    }

    /// Re-validate a finished wizard against the current snapshot and commit
    /// its records. Returns the new store revision.
    pub fn commit_wizard<W: Wizard>(&self, wizard: &W) -> Result<u64, WizardError> {
        let data = self.store.snapshot()?;
        let changes = wizard.finish(&FarmView::new(&data, &self.config))?;
        let records = changes.len();
        let revision = self.store.commit(changes)?;
        info!(wizard = W::NAME, records, revision, "wizard committed");
        Ok(revision)
    }

    fn commit_one(&self, kind: &'static str, record: impl Into<Record>) -> LedgerResult<()> {
        let mut changes = ChangeSet::new();
        changes.insert(record);
        let revision = self.store.commit(changes)?;
        info!(kind, revision, "record registered");
        Ok(())
    }
}

fn ensure_building(view: &FarmView<'_>, building: BuildingId) -> Result<(), DomainError> {
    match view.layout().group(building) {
        Some(group) if group.is_building() => Ok(()),
        Some(_) => Err(DomainError::validation(format!("room group {building} is not a building"))),
        None => Err(DomainError::not_found(format!("building {building}"))),
    }
}

fn ensure_feed_type(view: &FarmView<'_>, feed_type: FeedTypeId) -> Result<(), DomainError> {
    if view.data().feed_types.iter().any(|t| t.id == feed_type) {
        Ok(())
    } else {
        Err(DomainError::not_found(format!("feed type {feed_type}")))
    }
}

fn ensure_available(view: &FarmView<'_>, medicine: MedicineId, quantity: f64) -> Result<(), DomainError> {
    let available = view.medicine_availability(medicine);
    if quantity > available {
        return Err(DomainError::validation(format!(
            "only {available} of medicine {medicine} in stock"
        )));
    }
    Ok(())
}

/// Every record belonging to `flock`, deleted in an order that keeps the
/// ledger valid, followed by the flock itself.
fn flock_cascade(data: &FarmData, flock: FlockId) -> ChangeSet {
    let entries: BTreeSet<RoomEntryId> = data
        .room_entries
        .iter()
        .filter(|e| e.flock == flock)
        .map(|e| e.id)
        .collect();
    let exits: BTreeSet<RoomExitId> = data
        .room_exits
        .iter()
        .filter(|e| e.flock == flock)
        .map(|e| e.id)
        .collect();

    let mut changes = ChangeSet::new();
    for transfer in data
        .transfers
        .iter()
        .filter(|t| entries.contains(&t.room_entry) || exits.contains(&t.room_exit))
    {
        changes.delete(RecordKey::Transfer(transfer.id));
    }
    for id in &exits {
        changes.delete(RecordKey::RoomExit(*id));
    }
    for id in &entries {
        changes.delete(RecordKey::RoomEntry(*id));
    }

    for death in data.deaths.iter().filter(|d| d.flock == flock) {
        if data.deaths_in_room.iter().any(|r| r.death == death.id) {
            changes.delete(RecordKey::DeathInRoom(death.id));
        }
        changes.delete(RecordKey::Death(death.id));
    }
    for separation in data.separations.iter().filter(|s| s.flock == flock) {
        if data.separated_from_room.iter().any(|r| r.separation == separation.id) {
            changes.delete(RecordKey::SeparatedFromRoom(separation.id));
        }
        changes.delete(RecordKey::Separation(separation.id));
    }
    for treatment in data.treatments.iter().filter(|t| t.flock == flock) {
        for application in data.applications.iter().filter(|a| a.treatment == treatment.id) {
            changes.delete(RecordKey::Application(application.id));
        }
        changes.delete(RecordKey::Treatment(treatment.id));
    }

    let mut farm_exits: BTreeSet<FarmExitId> = BTreeSet::new();
    for exit in data.flock_exits.iter().filter(|e| e.flock == flock) {
        farm_exits.extend(exit.farm_exit);
        changes.delete(RecordKey::FlockExit(exit.id));
    }
    // Farm exits shared with other flocks stay.
    for farm_exit in farm_exits {
        let shared = data
            .flock_exits
            .iter()
            .any(|e| e.farm_exit == Some(farm_exit) && e.flock != flock);
        if !shared {
            changes.delete(RecordKey::FarmExit(farm_exit));
        }
    }

    changes.delete(RecordKey::Flock(flock));
    changes
}
