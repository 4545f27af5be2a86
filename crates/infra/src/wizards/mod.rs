//! Multi-step data entry flows.
//!
//! A wizard is a linear state machine over named steps. Each `submit_*`
//! call validates one step against the current farm snapshot and stores its
//! data; on error the wizard stays where it is. `finish` re-validates the
//! whole accumulator against a fresh snapshot and yields one `ChangeSet`,
//! which the store commits atomically.
//!
//! Two sessions may still validate against the same snapshot and both try
//! to commit; the store's integrity checks reject whichever would break the
//! movement ledger.

pub mod death;
pub mod entry;
pub mod exit;
pub mod separation;
pub mod transfer;
pub mod treatment;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use chrono::NaiveDate;
use farmledger_core::{DomainError, RoomId};

use crate::store::{ChangeSet, StoreError};
use crate::view::FarmView;

pub use death::{AnimalDistinction, DeathInformation, DeathStep, DeathWizard};
pub use entry::{AnimalEntryWizard, EntryStep, FlockInformation};
pub use exit::{AnimalExitWizard, ExitOverview, ExitStep, GeneralExitInformation};
pub use separation::{SeparationInformation, SeparationStep, SeparationWizard};
pub use transfer::{TransferDestination, TransferInformation, TransferStep, TransferWizard};
pub use treatment::{
    DosageInformation, MedicationChoice, RoomAndSymptoms, TreatmentStep, TreatmentWizard,
};

/// Field-level validation messages, keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// A message about the form as a whole (e.g. totals that do not match).
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// `Ok` when nothing was reported, the logged `WizardError::Form` otherwise.
    pub fn check(self, wizard: &'static str, step: &'static str) -> Result<(), WizardError> {
        if self.is_empty() {
            return Ok(());
        }
        warn!(wizard, step, errors = %self, "wizard step rejected");
        Err(WizardError::Form(self))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| {
            let out = if first { Ok(()) } else { f.write_str("; ") };
            first = false;
            out
        };
        for message in &self.non_field {
            sep(f)?;
            f.write_str(message)?;
        }
        for (field, messages) in &self.fields {
            for message in messages {
                sep(f)?;
                write!(f, "{field}: {message}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("invalid input: {0}")]
    Form(FormErrors),

    #[error("step '{submitted}' submitted while on '{current}'")]
    WrongStep {
        current: &'static str,
        submitted: &'static str,
    },

    #[error("step '{0}' has no data yet")]
    Incomplete(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for WizardError {
    fn from(value: DomainError) -> Self {
        let mut errors = FormErrors::new();
        errors.add_non_field(value.message());
        WizardError::Form(errors)
    }
}

/// Named, ordered steps of one wizard.
pub trait WizardStep: Copy + Eq + fmt::Debug + 'static {
    /// Every step in the order a user walks through them.
    const ORDER: &'static [Self];
    const FIRST: Self;

    fn name(self) -> &'static str;
}

/// Current step plus the path taken to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCursor<S: WizardStep> {
    current: S,
    previous: Vec<S>,
}

impl<S: WizardStep> Default for StepCursor<S> {
    fn default() -> Self {
        Self {
            current: S::FIRST,
            previous: Vec::new(),
        }
    }
}

impl<S: WizardStep> StepCursor<S> {
    pub fn current(&self) -> S {
        self.current
    }

    pub fn ensure_at(&self, step: S) -> Result<(), WizardError> {
        if self.current != step {
            return Err(WizardError::WrongStep {
                current: self.current.name(),
                submitted: step.name(),
            });
        }
        Ok(())
    }

    /// Move to `next`, remembering where we came from.
    pub fn advance_to(&mut self, next: S) {
        if next != self.current {
            self.previous.push(self.current);
            self.current = next;
        }
    }

    /// Move to the step following the current one; stays put on the last.
    pub fn advance(&mut self) {
        let next = S::ORDER
            .iter()
            .position(|s| *s == self.current)
            .and_then(|idx| S::ORDER.get(idx + 1))
            .copied();
        if let Some(next) = next {
            self.advance_to(next);
        }
    }

    /// Return to the previous step; `false` on the first one.
    pub fn back(&mut self) -> bool {
        match self.previous.pop() {
            Some(step) => {
                self.current = step;
                true
            }
            None => false,
        }
    }

    pub fn is_last(&self) -> bool {
        S::ORDER.last() == Some(&self.current)
    }

    /// `WrongStep` unless the wizard reached its final step.
    pub fn ensure_last(&self) -> Result<(), WizardError> {
        match S::ORDER.last() {
            Some(last) => self.ensure_at(*last),
            None => Ok(()),
        }
    }
}

/// Common surface of every wizard.
pub trait Wizard {
    type Step: WizardStep;

    const NAME: &'static str;

    fn cursor(&self) -> &StepCursor<Self::Step>;

    fn cursor_mut(&mut self) -> &mut StepCursor<Self::Step>;

    fn current_step(&self) -> Self::Step {
        self.cursor().current()
    }

    fn back(&mut self) -> bool {
        self.cursor_mut().back()
    }

    /// Re-validate everything against `view` and build the records to commit.
    fn finish(&self, view: &FarmView<'_>) -> Result<ChangeSet, WizardError>;
}

/// Count assigned to one room in a multi-room step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCount {
    pub room: RoomId,
    pub number_of_animals: i64,
}

/// Field name for the `idx`-th row of a per-room list.
fn row_field(idx: usize) -> String {
    format!("rooms[{idx}]")
}

/// Rooms must be known and listed once.
fn check_room_selection(view: &FarmView<'_>, rooms: &[RoomId], errors: &mut FormErrors) {
    if rooms.is_empty() {
        errors.add("rooms", "select at least one room");
    }
    for (idx, room) in rooms.iter().enumerate() {
        if view.room(*room).is_err() {
            errors.add("rooms", format!("unknown room {room}"));
        }
        if rooms[..idx].contains(room) {
            errors.add("rooms", "a room was selected twice");
        }
    }
}

/// Per-room counts for an exit: one row per `selected` room at most, each
/// within the room's occupancy at `date`, each non-empty row from a
/// single-flock room, together equal to `total`.
fn check_room_exits(
    view: &FarmView<'_>,
    date: NaiveDate,
    total: i64,
    selected: &[RoomId],
    rows: &[RoomCount],
    errors: &mut FormErrors,
) {
    let mut sum = 0;
    for (idx, row) in rows.iter().enumerate() {
        let field = row_field(idx);
        let Ok(room) = view.room(row.room) else {
            errors.add(&field, format!("unknown room {}", row.room));
            continue;
        };
        if !selected.contains(&row.room) {
            errors.add(&field, "room was not selected");
            continue;
        }
        if rows[..idx].iter().any(|r| r.room == row.room) {
            errors.add(&field, "room is listed more than once");
            continue;
        }
        if row.number_of_animals < 0 {
            errors.add(&field, "number of animals cannot be negative");
            continue;
        }
        sum += row.number_of_animals;
        if row.number_of_animals == 0 {
            continue;
        }

        let ledger = view.room_ledger(room.id);
        let occupancy = ledger.occupancy_at(date);
        if row.number_of_animals > occupancy {
            errors.add(
                &field,
                format!(
                    "number of animals for room {} must not exceed its occupancy of {occupancy}",
                    view.layout().room_label(room)
                ),
            );
        } else if ledger.flocks_present_at(date).len() > 1 {
            errors.add(&field, "unable to handle rooms with more than one flock");
        }
    }
    if sum != total {
        errors.add_non_field(format!(
            "{sum} animals assigned to rooms, expected {total}"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Step {
        One,
        Two,
        Three,
    }

    impl WizardStep for Step {
        const ORDER: &'static [Self] = &[Step::One, Step::Two, Step::Three];
        const FIRST: Self = Step::One;

        fn name(self) -> &'static str {
            match self {
                Step::One => "one",
                Step::Two => "two",
                Step::Three => "three",
            }
        }
    }

    #[test]
    fn cursor_walks_forward_and_back() {
        let mut cursor = StepCursor::<Step>::default();
        assert!(!cursor.back());
        cursor.advance();
        cursor.advance();
        assert!(cursor.is_last());
        cursor.advance();
        assert_eq!(cursor.current(), Step::Three);
        assert!(cursor.back());
        assert_eq!(cursor.current(), Step::Two);
    }

    #[test]
    fn skipped_steps_are_skipped_on_the_way_back() {
        let mut cursor = StepCursor::<Step>::default();
        cursor.advance_to(Step::Three);
        assert!(cursor.back());
        assert_eq!(cursor.current(), Step::One);
    }

    #[test]
    fn wrong_step_names_both_steps() {
        let cursor = StepCursor::<Step>::default();
        let err = cursor.ensure_at(Step::Two).unwrap_err();
        assert_eq!(err.to_string(), "step 'two' submitted while on 'one'");
        assert!(cursor.ensure_last().is_err());
    }

    #[test]
    fn form_errors_render_all_messages() {
        let mut errors = FormErrors::new();
        assert!(errors.clone().check("test", "one").is_ok());
        errors.add("weight", "must be positive");
        errors.add_non_field("totals differ");
        assert_eq!(errors.field("weight"), ["must be positive".to_string()]);
        assert!(errors.field("rooms").is_empty());
        assert_eq!(errors.to_string(), "totals differ; weight: must be positive");
        assert!(matches!(errors.check("test", "one"), Err(WizardError::Form(_))));
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use farmledger_buildings::{AnimalRoomEntry, Room, RoomGroup};
    use farmledger_core::{FlockId, RoomGroupId, RoomId};
    use farmledger_flocks::Flock;

    use crate::config::FarmConfig;
    use crate::store::{ChangeSet, FarmData};
    use crate::view::FarmView;

    pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// One building with whatever rooms and flocks a test adds.
    pub struct Farm {
        pub data: FarmData,
        pub config: FarmConfig,
        pub building: RoomGroupId,
    }

    impl Farm {
        pub fn new() -> Self {
            let building = RoomGroup::building("Stable 1", None).unwrap();
            let mut data = FarmData::default();
            let id = building.id;
            data.insert(building.into()).unwrap();
            Self {
                data,
                config: FarmConfig::default(),
                building: id,
            }
        }

        pub fn room(&mut self, name: &str, capacity: i64, separation: bool) -> RoomId {
            let room = Room::new(name, capacity, self.building, separation).unwrap();
            let id = room.id;
            self.data.insert(room.into()).unwrap();
            id
        }

        /// A flock of 25 kg animals spread over `placements`.
        pub fn flock(&mut self, date: NaiveDate, placements: &[(RoomId, i64)]) -> FlockId {
            let n: i64 = placements.iter().map(|(_, n)| n).sum();
            let flock = Flock::new(date, 25.0 * n as f64, n).unwrap();
            let id = flock.id;
            self.data.insert(flock.into()).unwrap();
            for (room, count) in placements {
                let entry = AnimalRoomEntry::new(date, *count, id, *room).unwrap();
                self.data.insert(entry.into()).unwrap();
            }
            id
        }

        pub fn commit(&mut self, changes: &ChangeSet) {
            changes.apply_to(&mut self.data).unwrap();
        }

        pub fn view(&self) -> FarmView<'_> {
            FarmView::new(&self.data, &self.config)
        }
    }
}
