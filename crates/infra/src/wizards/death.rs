//! Death: one animal died in a room.
//!
//! In a separation room holding animals of several origins the user says
//! which separation the dead animal belongs to; elsewhere the room's only
//! flock is used.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use farmledger_buildings::{AnimalRoomExit, DeathInRoom};
use farmledger_core::{FlockId, RoomId, SeparationId};
use farmledger_flocks::{AnimalDeath, AnimalSeparation};

use super::separation::active_separations_into;
use super::{FormErrors, StepCursor, Wizard, WizardError, WizardStep};
use crate::store::ChangeSet;
use crate::view::FarmView;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathStep {
    DeathInformation,
    AnimalDistinction,
    Overview,
}

impl WizardStep for DeathStep {
    const ORDER: &'static [Self] = &[
        DeathStep::DeathInformation,
        DeathStep::AnimalDistinction,
        DeathStep::Overview,
    ];
    const FIRST: Self = DeathStep::DeathInformation;

    fn name(self) -> &'static str {
        match self {
            DeathStep::DeathInformation => "death_information",
            DeathStep::AnimalDistinction => "animal_distinction",
            DeathStep::Overview => "overview",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathInformation {
    pub date: NaiveDate,
    pub room: RoomId,
    /// Weight of the carcass, in kg.
    pub weight: f64,
    pub cause: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalDistinction {
    pub separation: SeparationId,
}

#[derive(Debug, Clone, Default)]
pub struct DeathWizard {
    cursor: StepCursor<DeathStep>,
    information: Option<DeathInformation>,
    distinction: Option<AnimalDistinction>,
}

impl DeathWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_death_information(
        &mut self,
        view: &FarmView<'_>,
        information: DeathInformation,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(DeathStep::DeathInformation)?;
        let mut errors = FormErrors::new();
        check_information(view, &information, &mut errors);
        errors.check(Self::NAME, DeathStep::DeathInformation.name())?;

        let next = if needs_distinction(view, &information) {
            DeathStep::AnimalDistinction
        } else {
            DeathStep::Overview
        };
        debug!(step = next.name(), "death: information accepted");
        self.information = Some(information);
        self.distinction = None;
        self.cursor.advance_to(next);
        Ok(())
    }

    /// Active separations that brought animals into the room of death.
    pub fn candidate_separations<'a>(&self, view: &FarmView<'a>) -> Vec<&'a AnimalSeparation> {
        match &self.information {
            Some(info) => candidates(view, info),
            None => Vec::new(),
        }
    }

    pub fn submit_animal_distinction(
        &mut self,
        view: &FarmView<'_>,
        distinction: AnimalDistinction,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(DeathStep::AnimalDistinction)?;
        let info = self
            .information
            .as_ref()
            .ok_or(WizardError::Incomplete(DeathStep::DeathInformation.name()))?;

        let mut errors = FormErrors::new();
        check_distinction(view, info, distinction, &mut errors);
        errors.check(Self::NAME, DeathStep::AnimalDistinction.name())?;

        self.distinction = Some(distinction);
        self.cursor.advance();
        Ok(())
    }
}

impl Wizard for DeathWizard {
    type Step = DeathStep;

    const NAME: &'static str = "death";

    fn cursor(&self) -> &StepCursor<DeathStep> {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut StepCursor<DeathStep> {
        &mut self.cursor
    }

    fn finish(&self, view: &FarmView<'_>) -> Result<ChangeSet, WizardError> {
        self.cursor.ensure_last()?;
        let info = self
            .information
            .as_ref()
            .ok_or(WizardError::Incomplete(DeathStep::DeathInformation.name()))?;

        let mut errors = FormErrors::new();
        check_information(view, info, &mut errors);
        let separation = match (needs_distinction(view, info), self.distinction) {
            (true, None) => return Err(WizardError::Incomplete(DeathStep::AnimalDistinction.name())),
            (true, Some(distinction)) => check_distinction(view, info, distinction, &mut errors),
            (false, _) => None,
        };
        errors.check(Self::NAME, "finish")?;

        let flock = match separation {
            Some(separation) => separation.flock,
            None => view.room_ledger(info.room).single_flock_at(info.date)?,
        };
        // A lone animal in a separation room closes its separation too.
        let separation = separation.or_else(|| {
            let mut open = candidates(view, info).into_iter().filter(|s| s.flock == flock);
            match (open.next(), open.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        });

        let death = AnimalDeath::new(info.date, info.weight, info.cause.trim(), flock)?;
        let mut changes = ChangeSet::new();
        changes
            .insert(DeathInRoom {
                death: death.id,
                room: info.room,
            })
            .insert(AnimalRoomExit::new(info.date, info.room, 1, flock)?);
        if let Some(separation) = separation {
            let mut closed = separation.clone();
            closed.death = Some(death.id);
            changes.update(closed);
        }
        changes.insert(death);
        Ok(changes)
    }
}

fn check_information(view: &FarmView<'_>, info: &DeathInformation, errors: &mut FormErrors) {
    if !(info.weight.is_finite() && info.weight >= 0.0) {
        errors.add("weight", "weight must not be negative");
    }
    if let Err(e) = view.room(info.room) {
        errors.add("room", e.message());
        return;
    }
    let ledger = view.room_ledger(info.room);
    if ledger.occupancy_at(info.date) <= 0 {
        errors.add("room", "room was empty at death date");
    } else if !needs_distinction(view, info) && ledger.flocks_present_at(info.date).len() != 1 {
        errors.add("room", "no flock distinction possible");
    }
}

/// Separation rooms with more than one animal need the user to pick the animal.
fn needs_distinction(view: &FarmView<'_>, info: &DeathInformation) -> bool {
    view.room(info.room).is_ok_and(|room| room.is_separation)
        && view.occupancy(info.room, info.date) > 1
}

fn candidates<'a>(view: &FarmView<'a>, info: &DeathInformation) -> Vec<&'a AnimalSeparation> {
    active_separations_into(view, info.room, info.date)
}

fn check_distinction<'a>(
    view: &FarmView<'a>,
    info: &DeathInformation,
    distinction: AnimalDistinction,
    errors: &mut FormErrors,
) -> Option<&'a AnimalSeparation> {
    let separation = candidates(view, info)
        .into_iter()
        .find(|s| s.id == distinction.separation);
    match separation {
        Some(separation) if flock_in_room(view, info, separation.flock) => Some(separation),
        Some(_) => {
            errors.add("separation", "no animal of that flock left in the room");
            None
        }
        None => {
            errors.add("separation", "not an active separation into this room");
            None
        }
    }
}

fn flock_in_room(view: &FarmView<'_>, info: &DeathInformation, flock: FlockId) -> bool {
    view.room_ledger(info.room).animals_for_flock(flock, info.date) > 0
}
