use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farmledger_core::{
    DomainError, DomainResult, Entity, MedicineDiscardId, MedicineEntryId, MedicineId, TreatmentId,
};

use crate::treatment::{MedicineApplication, Treatment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    /// Flock age (days since entry) from which the medicine is recommended.
    pub recommended_age_start: i64,
    pub recommended_age_stop: i64,
    pub dosage_per_kg: f64,
    /// Days after the last application before animals may leave the farm.
    pub grace_period_days: u64,
    pub instructions: String,
}

impl Medicine {
    pub fn new(
        name: impl Into<String>,
        recommended_age_start: i64,
        recommended_age_stop: i64,
        dosage_per_kg: f64,
        grace_period_days: u64,
    ) -> DomainResult<Self> {
        let medicine = Self {
            id: MedicineId::new(),
            name: name.into().trim().to_string(),
            recommended_age_start,
            recommended_age_stop,
            dosage_per_kg,
            grace_period_days,
            instructions: String::new(),
        };
        medicine.validate()?;
        Ok(medicine)
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.is_empty() {
            return Err(DomainError::validation("medicine name cannot be empty"));
        }
        if self.recommended_age_start >= self.recommended_age_stop {
            return Err(DomainError::validation(
                "start age should be smaller than stop age",
            ));
        }
        if !(self.dosage_per_kg.is_finite() && self.dosage_per_kg >= 0.0) {
            return Err(DomainError::validation("dosage per kg must not be negative"));
        }
        Ok(())
    }

    pub fn is_recommended_at_age(&self, age: i64) -> bool {
        (self.recommended_age_start..=self.recommended_age_stop).contains(&age)
    }

    /// Dosage for an animal of `weight_kg`.
    pub fn suggested_dosage(&self, weight_kg: f64) -> f64 {
        self.dosage_per_kg * weight_kg
    }
}

impl Entity for Medicine {
    type Id = MedicineId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Medicine bought into the farm's stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineEntry {
    pub id: MedicineEntryId,
    pub date: NaiveDate,
    pub medicine: MedicineId,
    pub quantity: f64,
    pub expiration_date: NaiveDate,
}

impl MedicineEntry {
    pub fn new(date: NaiveDate, medicine: MedicineId, quantity: f64, expiration_date: NaiveDate) -> DomainResult<Self> {
        ensure_quantity(quantity)?;
        Ok(Self {
            id: MedicineEntryId::new(),
            date,
            medicine,
            quantity,
            expiration_date,
        })
    }
}

impl Entity for MedicineEntry {
    type Id = MedicineEntryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Medicine thrown away (expired, spoiled, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineDiscard {
    pub id: MedicineDiscardId,
    pub date: NaiveDate,
    pub medicine: MedicineId,
    pub quantity: f64,
    pub reason: String,
}

impl MedicineDiscard {
    pub fn new(date: NaiveDate, medicine: MedicineId, quantity: f64, reason: impl Into<String>) -> DomainResult<Self> {
        ensure_quantity(quantity)?;
        let reason = reason.into();
        if reason.chars().count() > 100 {
            return Err(DomainError::validation("reason cannot exceed 100 characters"));
        }
        Ok(Self {
            id: MedicineDiscardId::new(),
            date,
            medicine,
            quantity,
            reason,
        })
    }
}

impl Entity for MedicineDiscard {
    type Id = MedicineDiscardId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

fn ensure_quantity(quantity: f64) -> DomainResult<()> {
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}

/// Stock of `medicine` on the farm: entries minus applied and discarded quantities.
pub fn availability<'a>(
    medicine: MedicineId,
    entries: impl IntoIterator<Item = &'a MedicineEntry>,
    discards: impl IntoIterator<Item = &'a MedicineDiscard>,
    treatments: impl IntoIterator<Item = &'a Treatment>,
    applications: impl IntoIterator<Item = &'a MedicineApplication>,
) -> f64 {
    let bought: f64 = entries
        .into_iter()
        .filter(|e| e.medicine == medicine)
        .map(|e| e.quantity)
        .sum();
    let discarded: f64 = discards
        .into_iter()
        .filter(|d| d.medicine == medicine)
        .map(|d| d.quantity)
        .sum();
    let treatments: HashSet<TreatmentId> = treatments
        .into_iter()
        .filter(|t| t.medicine == medicine)
        .map(|t| t.id)
        .collect();
    let used: f64 = applications
        .into_iter()
        .filter(|a| treatments.contains(&a.treatment))
        .map(|a| a.dosage)
        .sum();
    bought - (used + discarded)
}

/// Medicines recommended at `age` first, the others after, each group by name.
pub fn medicines_by_suitability<'a>(
    medicines: impl IntoIterator<Item = &'a Medicine>,
    age: i64,
) -> Vec<&'a Medicine> {
    let mut sorted: Vec<_> = medicines.into_iter().collect();
    sorted.sort_by(|a, b| {
        b.is_recommended_at_age(age)
            .cmp(&a.is_recommended_at_age(age))
            .then_with(|| a.name.cmp(&b.name))
    });
    sorted
}
