//! Animal entry: register (or edit) a flock and place it into rooms.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use farmledger_buildings::AnimalRoomEntry;
use farmledger_core::{FlockId, RoomId};
use farmledger_flocks::Flock;

use super::{FormErrors, RoomCount, StepCursor, Wizard, WizardError, WizardStep, check_room_selection, row_field};
use crate::store::{ChangeSet, RecordKey};
use crate::view::FarmView;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStep {
    FlockInformation,
    BuildingInformation,
}

impl WizardStep for EntryStep {
    const ORDER: &'static [Self] = &[EntryStep::FlockInformation, EntryStep::BuildingInformation];
    const FIRST: Self = EntryStep::FlockInformation;

    fn name(self) -> &'static str {
        match self {
            EntryStep::FlockInformation => "flock_information",
            EntryStep::BuildingInformation => "building_information",
        }
    }
}

/// First step: the flock itself and the rooms it goes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockInformation {
    pub entry_date: NaiveDate,
    /// Total weight of all animals, in kg.
    pub entry_weight: f64,
    pub number_of_animals: i64,
    pub rooms: Vec<RoomId>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimalEntryWizard {
    cursor: StepCursor<EntryStep>,
    editing: Option<FlockId>,
    flock_information: Option<FlockInformation>,
    placements: Option<Vec<RoomCount>>,
    warnings: Vec<String>,
}

impl AnimalEntryWizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit an existing flock; its current data pre-fills the first step.
    pub fn edit(view: &FarmView<'_>, flock: FlockId) -> Result<Self, WizardError> {
        view.flock(flock)?;
        Ok(Self {
            editing: Some(flock),
            ..Self::default()
        })
    }

    pub fn editing(&self) -> Option<FlockId> {
        self.editing
    }

    /// Values to show in the first step.
    pub fn initial_flock_information(&self, view: &FarmView<'_>) -> Option<FlockInformation> {
        if let Some(info) = &self.flock_information {
            return Some(info.clone());
        }
        let flock = view.flock(self.editing?).ok()?;
        let rooms = entries_of(view, flock).map(|e| e.room).collect();
        Some(FlockInformation {
            entry_date: flock.entry_date,
            entry_weight: flock.entry_weight,
            number_of_animals: flock.number_of_animals,
            rooms,
        })
    }

    pub fn submit_flock_information(
        &mut self,
        view: &FarmView<'_>,
        info: FlockInformation,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(EntryStep::FlockInformation)?;
        self.check_flock_information(view, &info)
            .check(Self::NAME, EntryStep::FlockInformation.name())?;

        debug!(animals = info.number_of_animals, rooms = info.rooms.len(), "entry: flock information accepted");
        self.flock_information = Some(info);
        self.placements = None;
        self.warnings.clear();
        self.cursor.advance();
        Ok(())
    }

    /// Even split of the flock over the selected rooms; the remainder goes
    /// to the first rooms so the counts add up.
    pub fn initial_placements(&self) -> Vec<RoomCount> {
        let Some(info) = &self.flock_information else {
            return Vec::new();
        };
        let rooms = info.rooms.len() as i64;
        if rooms == 0 {
            return Vec::new();
        }
        let share = info.number_of_animals / rooms;
        let remainder = info.number_of_animals % rooms;
        info.rooms
            .iter()
            .enumerate()
            .map(|(idx, room)| RoomCount {
                room: *room,
                number_of_animals: share + i64::from((idx as i64) < remainder),
            })
            .collect()
    }

    /// Counts per room. Returns capacity warnings; they do not block the step.
    pub fn submit_building_information(
        &mut self,
        view: &FarmView<'_>,
        placements: Vec<RoomCount>,
    ) -> Result<&[String], WizardError> {
        self.cursor.ensure_at(EntryStep::BuildingInformation)?;
        let info = self
            .flock_information
            .as_ref()
            .ok_or(WizardError::Incomplete(EntryStep::FlockInformation.name()))?;

        check_placements(info, &placements)
            .check(Self::NAME, EntryStep::BuildingInformation.name())?;

        self.warnings = placements
            .iter()
            .filter_map(|p| {
                let room = view.room(p.room).ok()?;
                (p.number_of_animals > room.capacity).then(|| {
                    format!(
                        "room {} holds at most {} animals, {} placed",
                        view.layout().room_label(room),
                        room.capacity,
                        p.number_of_animals
                    )
                })
            })
            .collect();
        self.placements = Some(placements);
        Ok(&self.warnings)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn check_flock_information(&self, view: &FarmView<'_>, info: &FlockInformation) -> FormErrors {
        let mut errors = FormErrors::new();
        if info.entry_weight <= 0.0 {
            errors.add("entry_weight", "weight must be positive");
        }
        if info.number_of_animals <= 0 {
            errors.add("number_of_animals", "number of animals must be positive");
        }
        check_room_selection(view, &info.rooms, &mut errors);
        if !errors.is_empty() {
            return errors;
        }

        for room in &info.rooms {
            let others = view
                .flocks_present(*room, info.entry_date)
                .into_keys()
                .filter(|flock| Some(*flock) != self.editing)
                .count();
            if others > 0 {
                let label = view
                    .room(*room)
                    .map(|r| view.layout().room_label(r))
                    .unwrap_or_else(|_| room.to_string());
                errors.add(
                    "rooms",
                    format!("room {label} already holds another flock on {}", info.entry_date),
                );
            }
        }
        errors
    }
}

impl Wizard for AnimalEntryWizard {
    type Step = EntryStep;

    const NAME: &'static str = "animal_entry";

    fn cursor(&self) -> &StepCursor<EntryStep> {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut StepCursor<EntryStep> {
        &mut self.cursor
    }

    fn finish(&self, view: &FarmView<'_>) -> Result<ChangeSet, WizardError> {
        self.cursor.ensure_last()?;
        let info = self
            .flock_information
            .as_ref()
            .ok_or(WizardError::Incomplete(EntryStep::FlockInformation.name()))?;
        let placements = self
            .placements
            .as_ref()
            .ok_or(WizardError::Incomplete(EntryStep::BuildingInformation.name()))?;

        let mut errors = self.check_flock_information(view, info);
        if errors.is_empty() {
            errors = check_placements(info, placements);
        }
        errors.check(Self::NAME, "finish")?;

        let mut changes = ChangeSet::new();
        match self.editing {
            None => {
                let flock = Flock::new(info.entry_date, info.entry_weight, info.number_of_animals)?;
                for p in placements.iter().filter(|p| p.number_of_animals > 0) {
                    changes.insert(AnimalRoomEntry::new(
                        info.entry_date,
                        p.number_of_animals,
                        flock.id,
                        p.room,
                    )?);
                }
                changes.insert(flock);
            }
            Some(id) => {
                let existing = view.flock(id)?;
                let mut flock = existing.clone();
                flock.entry_date = info.entry_date;
                flock.entry_weight = info.entry_weight;
                flock.number_of_animals = info.number_of_animals;
                flock.validate()?;
                changes.update(flock);

                let current: Vec<&AnimalRoomEntry> = entries_of(view, existing).collect();
                for p in placements {
                    let old = current.iter().find(|e| e.room == p.room);
                    match (old, p.number_of_animals > 0) {
                        (Some(old), true) => {
                            let mut entry = (*old).clone();
                            entry.date = info.entry_date;
                            entry.number_of_animals = p.number_of_animals;
                            changes.update(entry);
                        }
                        (Some(old), false) => {
                            changes.delete(RecordKey::RoomEntry(old.id));
                        }
                        (None, true) => {
                            changes.insert(AnimalRoomEntry::new(
                                info.entry_date,
                                p.number_of_animals,
                                id,
                                p.room,
                            )?);
                        }
                        (None, false) => {}
                    }
                }
                for old in current
                    .iter()
                    .filter(|e| !placements.iter().any(|p| p.room == e.room))
                {
                    changes.delete(RecordKey::RoomEntry(old.id));
                }
            }
        }
        Ok(changes)
    }
}

/// The room entries made when the flock arrived on the farm.
fn entries_of<'a>(view: &FarmView<'a>, flock: &'a Flock) -> impl Iterator<Item = &'a AnimalRoomEntry> {
    view.data()
        .room_entries
        .iter()
        .filter(move |e| e.flock == flock.id && e.date == flock.entry_date)
}

fn check_placements(info: &FlockInformation, placements: &[RoomCount]) -> FormErrors {
    let mut errors = FormErrors::new();
    let mut sum = 0;
    for (idx, p) in placements.iter().enumerate() {
        if !info.rooms.contains(&p.room) {
            errors.add(&row_field(idx), "room was not selected for this flock");
        }
        if placements[..idx].iter().any(|q| q.room == p.room) {
            errors.add(&row_field(idx), "a room was listed twice");
        }
        if p.number_of_animals < 0 {
            errors.add(&row_field(idx), "number of animals cannot be negative");
        }
        sum += p.number_of_animals;
    }
    if sum != info.number_of_animals {
        errors.add_non_field(format!(
            "{sum} animals placed in rooms, the flock has {}",
            info.number_of_animals
        ));
    }
    errors
}
