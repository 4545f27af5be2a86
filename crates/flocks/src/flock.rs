use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use farmledger_core::{DomainError, DomainResult, Entity, FlockId};

/// A cohort of animals that entered the farm together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flock {
    pub id: FlockId,
    pub entry_date: NaiveDate,
    /// Total weight of the cohort at entry (kg).
    pub entry_weight: f64,
    pub number_of_animals: i64,
}

impl Flock {
    pub fn new(entry_date: NaiveDate, entry_weight: f64, number_of_animals: i64) -> DomainResult<Self> {
        let flock = Self {
            id: FlockId::new(),
            entry_date,
            entry_weight,
            number_of_animals,
        };
        flock.validate()?;
        Ok(flock)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.number_of_animals <= 0 {
            return Err(DomainError::validation("number of animals must be positive"));
        }
        if !(self.entry_weight.is_finite() && self.entry_weight > 0.0) {
            return Err(DomainError::validation("entry weight must be positive"));
        }
        Ok(())
    }

    /// Display name: entry year plus the first block of the id.
    pub fn name(&self) -> String {
        let id = self.id.to_string();
        let short = id.split('-').next().unwrap_or(&id);
        format!("{}_{}", self.entry_date.year(), short)
    }

    pub fn average_entry_weight(&self) -> f64 {
        self.entry_weight / self.number_of_animals as f64
    }

    /// Days since entry; negative before the entry date.
    pub fn age_at(&self, at: NaiveDate) -> i64 {
        (at - self.entry_date).num_days()
    }
}

impl Entity for Flock {
    type Id = FlockId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_empty_or_weightless_flocks() {
        assert!(Flock::new(d(2017, 1, 1), 100.0, 0).is_err());
        assert!(Flock::new(d(2017, 1, 1), 0.0, 10).is_err());
        assert!(Flock::new(d(2017, 1, 1), f64::NAN, 10).is_err());
    }

    #[test]
    fn name_starts_with_entry_year() {
        let flock = Flock::new(d(2016, 3, 9), 2600.0, 130).unwrap();
        assert!(flock.name().starts_with("2016_"));
    }

    #[test]
    fn average_entry_weight_divides_by_count() {
        let flock = Flock::new(d(2016, 3, 9), 2600.0, 130).unwrap();
        assert!((flock.average_entry_weight() - 20.0).abs() < 1e-9);
        assert_eq!(flock.age_at(d(2016, 3, 19)), 10);
    }
}
