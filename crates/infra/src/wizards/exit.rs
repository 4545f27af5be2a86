//! Animal exit: animals sold or otherwise leaving the farm.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use farmledger_buildings::AnimalRoomExit;
use farmledger_core::{FlockId, RoomId};
use farmledger_flocks::{AnimalFarmExit, AnimalFlockExit};

use super::separation::active_separations_into;
use super::{FormErrors, RoomCount, StepCursor, Wizard, WizardError, WizardStep, check_room_exits, check_room_selection};
use crate::store::ChangeSet;
use crate::view::FarmView;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStep {
    GeneralInformation,
    BuildingInformation,
    Overview,
}

impl WizardStep for ExitStep {
    const ORDER: &'static [Self] = &[
        ExitStep::GeneralInformation,
        ExitStep::BuildingInformation,
        ExitStep::Overview,
    ];
    const FIRST: Self = ExitStep::GeneralInformation;

    fn name(self) -> &'static str {
        match self {
            ExitStep::GeneralInformation => "general_information",
            ExitStep::BuildingInformation => "building_information",
            ExitStep::Overview => "overview",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralExitInformation {
    pub date: NaiveDate,
    /// Total weight of all exiting animals, in kg.
    pub weight: f64,
    pub number_of_animals: i64,
    pub rooms: Vec<RoomId>,
}

/// What the exit will record, shown before committing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitOverview {
    pub date: NaiveDate,
    pub number_of_animals: i64,
    pub weight: f64,
    /// Animals and their share of the weight, per flock.
    pub flocks: BTreeMap<FlockId, (i64, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct AnimalExitWizard {
    cursor: StepCursor<ExitStep>,
    general: Option<GeneralExitInformation>,
    room_exits: Option<Vec<RoomCount>>,
}

impl AnimalExitWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_general_information(
        &mut self,
        view: &FarmView<'_>,
        general: GeneralExitInformation,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(ExitStep::GeneralInformation)?;
        check_general(view, &general).check(Self::NAME, ExitStep::GeneralInformation.name())?;

        debug!(animals = general.number_of_animals, "exit: general information accepted");
        self.general = Some(general);
        self.room_exits = None;
        self.cursor.advance();
        Ok(())
    }

    /// Every selected room, starting at zero animals.
    pub fn initial_room_exits(&self) -> Vec<RoomCount> {
        self.general
            .iter()
            .flat_map(|g| &g.rooms)
            .map(|room| RoomCount {
                room: *room,
                number_of_animals: 0,
            })
            .collect()
    }

    pub fn submit_building_information(
        &mut self,
        view: &FarmView<'_>,
        room_exits: Vec<RoomCount>,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(ExitStep::BuildingInformation)?;
        let general = self
            .general
            .as_ref()
            .ok_or(WizardError::Incomplete(ExitStep::GeneralInformation.name()))?;

        let mut errors = FormErrors::new();
        check_room_exits(view, general.date, general.number_of_animals, &general.rooms, &room_exits, &mut errors);
        errors.check(Self::NAME, ExitStep::BuildingInformation.name())?;

        self.room_exits = Some(room_exits);
        self.cursor.advance();
        Ok(())
    }

    /// Summary of the pending exit; `None` until the room step is done.
    pub fn overview(&self, view: &FarmView<'_>) -> Option<ExitOverview> {
        let general = self.general.as_ref()?;
        let per_flock = flock_counts(view, general.date, self.room_exits.as_deref()?).ok()?;
        let average = general.weight / general.number_of_animals as f64;
        Some(ExitOverview {
            date: general.date,
            number_of_animals: general.number_of_animals,
            weight: general.weight,
            flocks: per_flock
                .into_iter()
                .map(|(flock, n)| (flock, (n, average * n as f64)))
                .collect(),
        })
    }
}

impl Wizard for AnimalExitWizard {
    type Step = ExitStep;

    const NAME: &'static str = "animal_exit";

    fn cursor(&self) -> &StepCursor<ExitStep> {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut StepCursor<ExitStep> {
        &mut self.cursor
    }

    fn finish(&self, view: &FarmView<'_>) -> Result<ChangeSet, WizardError> {
        self.cursor.ensure_last()?;
        let general = self
            .general
            .as_ref()
            .ok_or(WizardError::Incomplete(ExitStep::GeneralInformation.name()))?;
        let room_exits = self
            .room_exits
            .as_ref()
            .ok_or(WizardError::Incomplete(ExitStep::BuildingInformation.name()))?;

        let mut errors = check_general(view, general);
        check_room_exits(view, general.date, general.number_of_animals, &general.rooms, room_exits, &mut errors);
        errors.check(Self::NAME, "finish")?;

        let farm_exit = AnimalFarmExit::new(general.date, general.weight, general.number_of_animals)?;
        let mut changes = ChangeSet::new();
        let mut flock_exits = BTreeMap::new();
        for (flock, n) in flock_counts(view, general.date, room_exits)? {
            let flock_exit = AnimalFlockExit::share_of(&farm_exit, flock, n)?;
            flock_exits.insert(flock, flock_exit.id);
            changes.insert(flock_exit);
        }
        for row in room_exits.iter().filter(|r| r.number_of_animals > 0) {
            let flock = view.room_ledger(row.room).single_flock_at(general.date)?;
            changes.insert(
                AnimalRoomExit::new(general.date, row.room, row.number_of_animals, flock)?
                    .with_farm_exit(farm_exit.id),
            );
            // Separated animals leaving the farm end their separation, oldest first.
            let Some(flock_exit) = flock_exits.get(&flock) else {
                continue;
            };
            let closed = active_separations_into(view, row.room, general.date)
                .into_iter()
                .filter(|s| s.flock == flock)
                .take(row.number_of_animals as usize);
            for separation in closed {
                let mut closed = separation.clone();
                closed.exit = Some(*flock_exit);
                changes.update(closed);
            }
        }
        changes.insert(farm_exit);
        Ok(changes)
    }
}

fn check_general(view: &FarmView<'_>, general: &GeneralExitInformation) -> FormErrors {
    let mut errors = FormErrors::new();
    if general.weight <= 0.0 {
        errors.add("weight", "weight must be positive");
    }
    if general.number_of_animals <= 0 {
        errors.add("number_of_animals", "number of animals must be positive");
    }
    check_room_selection(view, &general.rooms, &mut errors);
    errors
}

/// Exiting animals grouped by the flock occupying each room.
fn flock_counts(
    view: &FarmView<'_>,
    date: NaiveDate,
    room_exits: &[RoomCount],
) -> Result<BTreeMap<FlockId, i64>, WizardError> {
    let mut per_flock = BTreeMap::new();
    for row in room_exits.iter().filter(|r| r.number_of_animals > 0) {
        let flock = view.room_ledger(row.room).single_flock_at(date)?;
        *per_flock.entry(flock).or_insert(0) += row.number_of_animals;
    }
    Ok(per_flock)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{Farm, d};
    use super::super::separation::separation_changes;
    use super::*;

    fn general(rooms: Vec<RoomId>, n: i64) -> GeneralExitInformation {
        GeneralExitInformation {
            date: d(2017, 4, 1),
            weight: 110.0 * n as f64,
            number_of_animals: n,
            rooms,
        }
    }

    #[test]
    fn exits_two_flocks_in_one_go() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        let r2 = farm.room("Room 2", 50, false);
        let f1 = farm.flock(d(2017, 1, 1), &[(r1, 30)]);
        let f2 = farm.flock(d(2017, 1, 8), &[(r2, 30)]);

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![r1, r2], 25)).unwrap();
        assert_eq!(wizard.initial_room_exits().len(), 2);
        wizard
            .submit_building_information(
                &farm.view(),
                vec![
                    RoomCount { room: r1, number_of_animals: 20 },
                    RoomCount { room: r2, number_of_animals: 5 },
                ],
            )
            .unwrap();
        assert_eq!(wizard.current_step(), ExitStep::Overview);

        let overview = wizard.overview(&farm.view()).unwrap();
        assert_eq!(overview.flocks[&f1], (20, 2200.0));
        assert_eq!(overview.flocks[&f2], (5, 550.0));

        let changes = wizard.finish(&farm.view()).unwrap();
        farm.commit(&changes);

        assert_eq!(farm.data.farm_exits.len(), 1);
        assert_eq!(farm.data.flock_exits.len(), 2);
        assert_eq!(farm.view().occupancy(r1, d(2017, 4, 1)), 10);
        assert_eq!(farm.view().occupancy(r2, d(2017, 4, 1)), 25);
        let flock = farm.view().flock(f1).unwrap();
        assert_eq!(farm.view().population(flock).living_animals(), 10);
    }

    #[test]
    fn cannot_take_more_than_the_room_holds() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        farm.flock(d(2017, 1, 1), &[(r1, 10)]);

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![r1], 11)).unwrap();
        let err = wizard
            .submit_building_information(&farm.view(), vec![RoomCount { room: r1, number_of_animals: 11 }])
            .unwrap_err();
        let WizardError::Form(errors) = err else {
            panic!("expected form errors");
        };
        assert_eq!(errors.field("rooms[0]").len(), 1);
        assert_eq!(wizard.current_step(), ExitStep::BuildingInformation);
    }

    #[test]
    fn rooms_with_several_flocks_are_refused() {
        let mut farm = Farm::new();
        let sep = farm.room("Sep 1", 10, true);
        farm.flock(d(2017, 1, 1), &[(sep, 1)]);
        farm.flock(d(2017, 1, 2), &[(sep, 1)]);

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![sep], 2)).unwrap();
        let err = wizard
            .submit_building_information(&farm.view(), vec![RoomCount { room: sep, number_of_animals: 2 }])
            .unwrap_err();
        assert!(err.to_string().contains("more than one flock"));
    }

    #[test]
    fn finish_requires_the_overview() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        farm.flock(d(2017, 1, 1), &[(r1, 10)]);

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![r1], 10)).unwrap();
        assert!(matches!(
            wizard.finish(&farm.view()),
            Err(WizardError::WrongStep { current: "building_information", .. })
        ));
    }

    #[test]
    fn selling_a_separated_animal_ends_its_separation() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        let sep = farm.room("Sep 1", 5, true);
        let flock = farm.flock(d(2017, 1, 1), &[(r1, 10)]);
        farm.commit(&separation_changes(d(2017, 2, 1), flock, r1, sep, "Lame").unwrap());

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![sep], 1)).unwrap();
        wizard
            .submit_building_information(&farm.view(), vec![RoomCount { room: sep, number_of_animals: 1 }])
            .unwrap();
        farm.commit(&wizard.finish(&farm.view()).unwrap());

        assert_eq!(farm.view().occupancy(sep, d(2017, 4, 1)), 0);
        let population = farm.view().population(farm.view().flock(flock).unwrap());
        assert_eq!(population.active_separations(), 0);
        assert_eq!(farm.data.separations[0].exit, Some(farm.data.flock_exits[0].id));
    }

    #[test]
    fn regular_room_exit_leaves_separations_open() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        let sep = farm.room("Sep 1", 5, true);
        let flock = farm.flock(d(2017, 1, 1), &[(r1, 10)]);
        farm.commit(&separation_changes(d(2017, 2, 1), flock, r1, sep, "Lame").unwrap());

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![r1], 9)).unwrap();
        wizard
            .submit_building_information(&farm.view(), vec![RoomCount { room: r1, number_of_animals: 9 }])
            .unwrap();
        farm.commit(&wizard.finish(&farm.view()).unwrap());

        assert!(farm.data.separations[0].active());
    }

    #[test]
    fn room_listed_twice_is_a_field_error() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        farm.flock(d(2017, 1, 1), &[(r1, 10)]);

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![r1], 20)).unwrap();
        let err = wizard
            .submit_building_information(
                &farm.view(),
                vec![
                    RoomCount { room: r1, number_of_animals: 10 },
                    RoomCount { room: r1, number_of_animals: 10 },
                ],
            )
            .unwrap_err();
        let WizardError::Form(errors) = err else {
            panic!("expected form errors");
        };
        assert_eq!(errors.field("rooms[1]").len(), 1);
        assert_eq!(wizard.current_step(), ExitStep::BuildingInformation);
    }

    #[test]
    fn rows_for_unselected_rooms_are_rejected() {
        let mut farm = Farm::new();
        let r1 = farm.room("Room 1", 50, false);
        let r2 = farm.room("Room 2", 50, false);
        farm.flock(d(2017, 1, 1), &[(r1, 10), (r2, 10)]);

        let mut wizard = AnimalExitWizard::new();
        wizard.submit_general_information(&farm.view(), general(vec![r1], 5)).unwrap();
        let err = wizard
            .submit_building_information(&farm.view(), vec![RoomCount { room: r2, number_of_animals: 5 }])
            .unwrap_err();
        let WizardError::Form(errors) = err else {
            panic!("expected form errors");
        };
        assert_eq!(errors.field("rooms[0]").len(), 1);
    }
}
