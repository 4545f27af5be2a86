//! Treatment: start a medicine course for the flock in one room, optionally
//! separating the sick animal at the same time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use farmledger_core::{FlockId, MedicineId, RoomId};
use farmledger_flocks::Flock;
use farmledger_medications::{Medicine, MedicineApplication, Treatment, medicines_by_suitability};

use super::separation::{check_separation_rooms, separation_changes};
use super::{FormErrors, StepCursor, Wizard, WizardError, WizardStep};
use crate::store::ChangeSet;
use crate::view::FarmView;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentStep {
    RoomAndSymptoms,
    MedicationChoice,
    Dosage,
    Overview,
}

impl WizardStep for TreatmentStep {
    const ORDER: &'static [Self] = &[
        TreatmentStep::RoomAndSymptoms,
        TreatmentStep::MedicationChoice,
        TreatmentStep::Dosage,
        TreatmentStep::Overview,
    ];
    const FIRST: Self = TreatmentStep::RoomAndSymptoms;

    fn name(self) -> &'static str {
        match self {
            TreatmentStep::RoomAndSymptoms => "room_and_symptoms",
            TreatmentStep::MedicationChoice => "medication_choice",
            TreatmentStep::Dosage => "dosage",
            TreatmentStep::Overview => "overview",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAndSymptoms {
    pub date: NaiveDate,
    pub room: RoomId,
    /// Stored as the treatment's comments.
    pub symptoms: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationChoice {
    pub medicine: MedicineId,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageInformation {
    pub dosage: f64,
    /// Separation room to move the treated animal into.
    pub separate_to: Option<RoomId>,
}

#[derive(Debug, Clone, Default)]
pub struct TreatmentWizard {
    cursor: StepCursor<TreatmentStep>,
    room_and_symptoms: Option<RoomAndSymptoms>,
    flock: Option<FlockId>,
    medication: Option<MedicationChoice>,
    dosage: Option<DosageInformation>,
}

impl TreatmentWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_room_and_symptoms(
        &mut self,
        view: &FarmView<'_>,
        input: RoomAndSymptoms,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(TreatmentStep::RoomAndSymptoms)?;
        let mut errors = FormErrors::new();
        let flock = check_room(view, &input, &mut errors);
        errors.check(Self::NAME, TreatmentStep::RoomAndSymptoms.name())?;

        self.flock = flock;
        self.room_and_symptoms = Some(input);
        self.medication = None;
        self.dosage = None;
        self.cursor.advance();
        Ok(())
    }

    /// The flock being treated, known after the first step.
    pub fn flock(&self) -> Option<FlockId> {
        self.flock
    }

    /// All medicines, those recommended at the flock's age first.
    pub fn medicine_options<'a>(&self, view: &FarmView<'a>) -> Vec<&'a Medicine> {
        let Some((flock, date)) = self.flock_and_date(view) else {
            return Vec::new();
        };
        medicines_by_suitability(&view.data().medicines, flock.age_at(date))
    }

    pub fn submit_medication_choice(
        &mut self,
        view: &FarmView<'_>,
        choice: MedicationChoice,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(TreatmentStep::MedicationChoice)?;
        let mut errors = FormErrors::new();
        if let Err(e) = view.medicine(choice.medicine) {
            errors.add("medicine", e.message());
        }
        errors.check(Self::NAME, TreatmentStep::MedicationChoice.name())?;

        self.medication = Some(choice);
        self.dosage = None;
        self.cursor.advance();
        Ok(())
    }

    /// Dosage per kg times the flock's estimated weight on the treatment date.
    pub fn suggested_dosage(&self, view: &FarmView<'_>) -> Option<f64> {
        let (flock, date) = self.flock_and_date(view)?;
        let medicine = view.medicine(self.medication?.medicine).ok()?;
        let weight = view.estimated_weight(flock, date);
        debug!(weight, medicine = %medicine.name, "treatment: suggesting dosage");
        Some(medicine.suggested_dosage(weight))
    }

    pub fn submit_dosage(
        &mut self,
        view: &FarmView<'_>,
        dosage: DosageInformation,
    ) -> Result<(), WizardError> {
        self.cursor.ensure_at(TreatmentStep::Dosage)?;
        let input = self
            .room_and_symptoms
            .as_ref()
            .ok_or(WizardError::Incomplete(TreatmentStep::RoomAndSymptoms.name()))?;
        let medication = self
            .medication
            .ok_or(WizardError::Incomplete(TreatmentStep::MedicationChoice.name()))?;

        let mut errors = FormErrors::new();
        check_dosage(view, input, medication, &dosage, &mut errors);
        errors.check(Self::NAME, TreatmentStep::Dosage.name())?;

        self.dosage = Some(dosage);
        self.cursor.advance();
        Ok(())
    }

    fn flock_and_date<'a>(&self, view: &FarmView<'a>) -> Option<(&'a Flock, NaiveDate)> {
        let flock = view.flock(self.flock?).ok()?;
        Some((flock, self.room_and_symptoms.as_ref()?.date))
    }
}

impl Wizard for TreatmentWizard {
    type Step = TreatmentStep;

    const NAME: &'static str = "treatment";

    fn cursor(&self) -> &StepCursor<TreatmentStep> {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut StepCursor<TreatmentStep> {
        &mut self.cursor
    }

    fn finish(&self, view: &FarmView<'_>) -> Result<ChangeSet, WizardError> {
        self.cursor.ensure_last()?;
        let input = self
            .room_and_symptoms
            .as_ref()
            .ok_or(WizardError::Incomplete(TreatmentStep::RoomAndSymptoms.name()))?;
        let medication = self
            .medication
            .ok_or(WizardError::Incomplete(TreatmentStep::MedicationChoice.name()))?;
        let dosage = self
            .dosage
            .ok_or(WizardError::Incomplete(TreatmentStep::Dosage.name()))?;

        let mut errors = FormErrors::new();
        let flock = check_room(view, input, &mut errors);
        check_dosage(view, input, medication, &dosage, &mut errors);
        errors.check(Self::NAME, "finish")?;
        let flock = flock.ok_or(WizardError::Incomplete(TreatmentStep::RoomAndSymptoms.name()))?;

        let treatment = Treatment::new(input.date, medication.medicine, flock, input.symptoms.trim());
        let mut changes = ChangeSet::new();
        changes.insert(MedicineApplication::new(input.date, dosage.dosage, treatment.id)?);

        if let Some(destination) = dosage.separate_to {
            let medicine = view.medicine(medication.medicine)?;
            changes.extend(separation_changes(
                input.date,
                flock,
                input.room,
                destination,
                &format!("Treatment with {}", medicine.name),
            )?);
        }
        changes.insert(treatment);
        Ok(changes)
    }
}

/// The room must hold exactly one flock on the treatment date.
fn check_room(view: &FarmView<'_>, input: &RoomAndSymptoms, errors: &mut FormErrors) -> Option<FlockId> {
    if let Err(e) = view.room(input.room) {
        errors.add("room", e.message());
        return None;
    }
    match view.room_ledger(input.room).single_flock_at(input.date) {
        Ok(flock) => Some(flock),
        Err(e) => {
            errors.add("room", e.message());
            None
        }
    }
}

fn check_dosage(
    view: &FarmView<'_>,
    input: &RoomAndSymptoms,
    medication: MedicationChoice,
    dosage: &DosageInformation,
    errors: &mut FormErrors,
) {
    if !(dosage.dosage.is_finite() && dosage.dosage > 0.0) {
        errors.add("dosage", "dosage must be positive");
    } else {
        let available = view.medicine_availability(medication.medicine);
        if dosage.dosage > available {
            errors.add("dosage", format!("only {available} in stock"));
        }
    }
    if let Some(destination) = dosage.separate_to {
        check_separation_rooms(
            view,
            input.date,
            input.room,
            destination,
            errors,
            "room",
            "separate_to",
        );
    }
}
