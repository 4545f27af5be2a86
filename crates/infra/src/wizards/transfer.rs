//! Transfer: animals of one flock moved from one or more rooms into another.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use farmledger_buildings::{AnimalRoomEntry, AnimalRoomExit, AnimalRoomTransfer};
use farmledger_core::{FlockId, RoomId, TransferId};

use super::{FormErrors, RoomCount, StepCursor, Wizard, WizardError, WizardStep, check_room_exits, check_room_selection};
use crate::store::ChangeSet;
use crate::view::FarmView;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStep {
    TransferInformation,
    OriginDetails,
    Destination,
}

impl WizardStep for TransferStep {
    const ORDER: &'static [Self] = &[
        TransferStep::TransferInformation,
        TransferStep::OriginDetails,
        TransferStep::Destination,
    ];
    const FIRST: Self = TransferStep::TransferInformation;

    fn name(self) -> &'static str {
        match self {
            TransferStep::TransferInformation => "transfer_information",
            TransferStep::OriginDetails => "origin_details",
            TransferStep::Destination => "destination",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInformation {
    pub date: NaiveDate,
    pub number_of_animals: i64,
    /// Rooms the animals come from.
    pub rooms: Vec<RoomId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDestination {
    pub room: RoomId,
}

#[derive(Debug, Clone, Default)]
pub struct TransferWizard {
    cursor: StepCursor<TransferStep>,
    information: Option<TransferInformation>,
    origins: Option<Vec<RoomCount>>,
    destination: Option<TransferDestination>,
}

impl TransferWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_transfer_information(
        &mut self,
        view: &FarmView<'_>,
        information: TransferInformation,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(TransferStep::TransferInformation)?;
        check_information(view, &information).check(Self::NAME, TransferStep::TransferInformation.name())?;

        self.information = Some(information);
        self.origins = None;
        self.destination = None;
        self.cursor.advance();
        Ok(())
    }

    /// Per source room, the animals above its capacity (never negative).
    pub fn initial_origin_details(&self, view: &FarmView<'_>) -> Vec<RoomCount> {
        let Some(info) = &self.information else {
            return Vec::new();
        };
        info.rooms
            .iter()
            .map(|room| {
                let capacity = view.room(*room).map(|r| r.capacity).unwrap_or_default();
                RoomCount {
                    room: *room,
                    number_of_animals: (view.occupancy(*room, info.date) - capacity).max(0),
                }
            })
            .collect()
    }

    pub fn submit_origin_details(
        &mut self,
        view: &FarmView<'_>,
        origins: Vec<RoomCount>,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(TransferStep::OriginDetails)?;
        let info = self
            .information
            .as_ref()
            .ok_or(WizardError::Incomplete(TransferStep::TransferInformation.name()))?;

        let mut errors = FormErrors::new();
        check_origins(view, info, &origins, &mut errors);
        errors.check(Self::NAME, TransferStep::OriginDetails.name())?;

        self.origins = Some(origins);
        self.destination = None;
        self.cursor.advance();
        Ok(())
    }

    pub fn submit_destination(
        &mut self,
        view: &FarmView<'_>,
        destination: TransferDestination,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(TransferStep::Destination)?;
        let origins = self
            .origins
            .as_deref()
            .ok_or(WizardError::Incomplete(TransferStep::OriginDetails.name()))?;
        check_destination(view, origins, destination).check(Self::NAME, TransferStep::Destination.name())?;

        self.destination = Some(destination);
        Ok(())
    }
}

impl Wizard for TransferWizard {
    type Step = TransferStep;

    const NAME: &'static str = "transfer";

    fn cursor(&self) -> &StepCursor<TransferStep> {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut StepCursor<TransferStep> {
        &mut self.cursor
    }

    fn finish(&self, view: &FarmView<'_>) -> Result<ChangeSet, WizardError> {
        self.cursor.ensure_last()?;
        let info = self
            .information
            .as_ref()
            .ok_or(WizardError::Incomplete(TransferStep::TransferInformation.name()))?;
        let origins = self
            .origins
            .as_deref()
            .ok_or(WizardError::Incomplete(TransferStep::OriginDetails.name()))?;
        let destination = self
            .destination
            .ok_or(WizardError::Incomplete(TransferStep::Destination.name()))?;

        let mut errors = check_information(view, info);
        let flock = check_origins(view, info, origins, &mut errors);
        if errors.is_empty() {
            errors = check_destination(view, origins, destination);
        }
        errors.check(Self::NAME, "finish")?;
        let flock = flock.ok_or(WizardError::Incomplete(TransferStep::OriginDetails.name()))?;

        let entry = AnimalRoomEntry::new(info.date, info.number_of_animals, flock, destination.room)?;
        let mut changes = ChangeSet::new();
        let mut sources = 0;
        for origin in origins.iter().filter(|o| o.number_of_animals > 0) {
            let exit = AnimalRoomExit::new(info.date, origin.room, origin.number_of_animals, flock)?;
            changes
                .insert(AnimalRoomTransfer {
                    id: TransferId::new(),
                    room_entry: entry.id,
                    room_exit: exit.id,
                })
                .insert(exit);
            sources += 1;
        }
        changes.insert(entry);
        debug!(animals = info.number_of_animals, sources, "transfer: prepared");
        Ok(changes)
    }
}

fn check_information(view: &FarmView<'_>, info: &TransferInformation) -> FormErrors {
    let mut errors = FormErrors::new();
    if info.number_of_animals <= 0 {
        errors.add("number_of_animals", "number of animals must be positive");
    }
    check_room_selection(view, &info.rooms, &mut errors);
    errors
}

/// Validates the per-room counts; returns the flock being moved.
fn check_origins(
    view: &FarmView<'_>,
    info: &TransferInformation,
    origins: &[RoomCount],
    errors: &mut FormErrors,
) -> Option<FlockId> {
    check_room_exits(view, info.date, info.number_of_animals, &info.rooms, origins, errors);
    if !errors.is_empty() {
        return None;
    }

    let mut flock = None;
    for origin in origins.iter().filter(|o| o.number_of_animals > 0) {
        let Ok(found) = view.room_ledger(origin.room).single_flock_at(info.date) else {
            continue;
        };
        match flock {
            None => flock = Some(found),
            Some(existing) if existing != found => {
                errors.add_non_field("animals of different flocks cannot be transferred together");
                return None;
            }
            Some(_) => {}
        }
    }
    flock
}

fn check_destination(view: &FarmView<'_>, origins: &[RoomCount], destination: TransferDestination) -> FormErrors {
    let mut errors = FormErrors::new();
    if let Err(e) = view.room(destination.room) {
        errors.add("room", e.message());
    }
    if origins
        .iter()
        .any(|o| o.room == destination.room && o.number_of_animals > 0)
    {
        errors.add("room", "animals cannot be transferred into a room they leave");
    }
    errors
}
