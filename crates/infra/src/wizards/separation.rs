//! Separation: one animal moved from its room into a separation room.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farmledger_buildings::{AnimalRoomEntry, AnimalRoomExit, AnimalSeparatedFromRoom};
use farmledger_core::{DomainResult, FlockId, RoomId};
use farmledger_flocks::AnimalSeparation;

use super::{FormErrors, StepCursor, Wizard, WizardError, WizardStep};
use crate::store::ChangeSet;
use crate::view::FarmView;

const REASON_MAX_LEN: usize = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparationStep {
    SeparationInformation,
    Overview,
}

impl WizardStep for SeparationStep {
    const ORDER: &'static [Self] = &[SeparationStep::SeparationInformation, SeparationStep::Overview];
    const FIRST: Self = SeparationStep::SeparationInformation;

    fn name(self) -> &'static str {
        match self {
            SeparationStep::SeparationInformation => "separation_information",
            SeparationStep::Overview => "overview",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeparationInformation {
    pub date: NaiveDate,
    pub source: RoomId,
    pub destination: RoomId,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SeparationWizard {
    cursor: StepCursor<SeparationStep>,
    information: Option<SeparationInformation>,
}

impl SeparationWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_separation_information(
        &mut self,
        view: &FarmView<'_>,
        information: SeparationInformation,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(SeparationStep::SeparationInformation)?;
        let mut errors = FormErrors::new();
        check_separation(view, &information, &mut errors);
        errors.check(Self::NAME, SeparationStep::SeparationInformation.name())?;

        self.information = Some(information);
        self.cursor.advance();
        Ok(())
    }

    pub fn information(&self) -> Option<&SeparationInformation> {
        self.information.as_ref()
    }
}

impl Wizard for SeparationWizard {
    type Step = SeparationStep;

    const NAME: &'static str = "separation";

    fn cursor(&self) -> &StepCursor<SeparationStep> {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut StepCursor<SeparationStep> {
        &mut self.cursor
    }

    fn finish(&self, view: &FarmView<'_>) -> Result<ChangeSet, WizardError> {
        self.cursor.ensure_last()?;
        let info = self
            .information
            .as_ref()
            .ok_or(WizardError::Incomplete(SeparationStep::SeparationInformation.name()))?;
        let mut errors = FormErrors::new();
        let flock = check_separation(view, info, &mut errors);
        errors.check(Self::NAME, "finish")?;
        let flock = flock.ok_or(WizardError::Incomplete(SeparationStep::SeparationInformation.name()))?;

        Ok(separation_changes(
            info.date,
            flock,
            info.source,
            info.destination,
            info.reason.trim(),
        )?)
    }
}

/// Records moving one animal of `flock` into a separation room.
pub(crate) fn separation_changes(
    date: NaiveDate,
    flock: FlockId,
    source: RoomId,
    destination: RoomId,
    reason: &str,
) -> DomainResult<ChangeSet> {
    let separation = AnimalSeparation::new(date, flock, reason);
    let mut changes = ChangeSet::new();
    changes
        .insert(AnimalSeparatedFromRoom {
            separation: separation.id,
            room: source,
            destination: Some(destination),
        })
        .insert(AnimalRoomExit::new(date, source, 1, flock)?)
        .insert(AnimalRoomEntry::new(date, 1, flock, destination)?)
        .insert(separation);
    Ok(changes)
}

/// Active separations, started on or before `date`, that moved an animal into
/// `room`; oldest first.
pub(crate) fn active_separations_into<'a>(
    view: &FarmView<'a>,
    room: RoomId,
    date: NaiveDate,
) -> Vec<&'a AnimalSeparation> {
    let data = view.data();
    let mut found: Vec<_> = data
        .separations
        .iter()
        .filter(|s| s.active() && s.date <= date)
        .filter(|s| {
            data.separated_from_room
                .iter()
                .any(|r| r.separation == s.id && r.destination == Some(room))
        })
        .collect();
    found.sort_by_key(|s| s.date);
    found
}

/// A source room holding animals of exactly one flock, sending one to a
/// separation room. Returns that flock when the rooms check out.
pub(crate) fn check_separation_rooms(
    view: &FarmView<'_>,
    date: NaiveDate,
    source: RoomId,
    destination: RoomId,
    errors: &mut FormErrors,
    source_field: &str,
    destination_field: &str,
) -> Option<FlockId> {
    match view.room(destination) {
        Ok(room) if !room.is_separation => {
            errors.add(destination_field, "destination must be a separation room");
        }
        Ok(_) => {}
        Err(e) => errors.add(destination_field, e.message()),
    }
    let room = match view.room(source) {
        Ok(room) => room,
        Err(e) => {
            errors.add(source_field, e.message());
            return None;
        }
    };
    if room.is_separation {
        errors.add(source_field, "animals are already in a separation room");
        return None;
    }
    if source == destination {
        errors.add(destination_field, "destination must differ from the source room");
    }
    match view.room_ledger(source).single_flock_at(date) {
        Ok(flock) => Some(flock),
        Err(e) => {
            errors.add(source_field, e.message());
            None
        }
    }
}

fn check_separation(
    view: &FarmView<'_>,
    info: &SeparationInformation,
    errors: &mut FormErrors,
) -> Option<FlockId> {
    let reason = info.reason.trim();
    if reason.is_empty() {
        errors.add("reason", "a reason is required");
    } else if reason.chars().count() > REASON_MAX_LEN {
        errors.add("reason", format!("at most {REASON_MAX_LEN} characters"));
    }
    check_separation_rooms(
        view,
        info.date,
        info.source,
        info.destination,
        errors,
        "source",
        "destination",
    )
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{Farm, d};
    use super::*;

    #[test]
    fn moves_one_animal_into_the_separation_room() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        let sep = farm.room("Sep 1", 5, true);
        let flock = farm.flock(d(2017, 1, 1), &[(r1, 30)]);

        let mut wizard = SeparationWizard::new();
        wizard
            .submit_separation_information(
                &farm.view(),
                SeparationInformation {
                    date: d(2017, 2, 1),
                    source: r1,
                    destination: sep,
                    reason: "Lame".into(),
                },
            )
            .unwrap();
        let changes = wizard.finish(&farm.view()).unwrap();
        farm.commit(&changes);

        let at = d(2017, 2, 1);
        assert_eq!(farm.view().occupancy(r1, at), 29);
        assert_eq!(farm.view().occupancy(sep, at), 1);
        let population = farm.view().population(farm.view().flock(flock).unwrap());
        assert_eq!(population.active_separations(), 1);
        // Separated animals still count as living.
        assert_eq!(population.living_animals(), 30);
        assert_eq!(farm.data.separated_from_room[0].destination, Some(sep));
    }

    #[test]
    fn rooms_must_have_the_right_kind() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        let r2 = farm.room("Room 2", 50, false);
        farm.flock(d(2017, 1, 1), &[(r1, 30)]);

        let mut wizard = SeparationWizard::new();
        let err = wizard
            .submit_separation_information(
                &farm.view(),
                SeparationInformation {
                    date: d(2017, 2, 1),
                    source: r1,
                    destination: r2,
                    reason: " ".into(),
                },
            )
            .unwrap_err();
        let WizardError::Form(errors) = err else {
            panic!("expected form errors");
        };
        assert_eq!(errors.field("destination").len(), 1);
        assert_eq!(errors.field("reason").len(), 1);
        assert!(errors.field("source").is_empty());
    }

    #[test]
    fn empty_source_room_is_rejected() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        let sep = farm.room("Sep 1", 5, true);

        let mut wizard = SeparationWizard::new();
        let err = wizard
            .submit_separation_information(
                &farm.view(),
                SeparationInformation {
                    date: d(2017, 2, 1),
                    source: r1,
                    destination: sep,
                    reason: "Lame".into(),
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
