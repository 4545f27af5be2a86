//! Records that permanently remove animals from a flock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farmledger_core::{DeathId, DomainError, DomainResult, Entity, FarmExitId, FlockExitId, FlockId};

use crate::flock::Flock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalDeath {
    pub id: DeathId,
    pub date: NaiveDate,
    pub weight: f64,
    pub cause: String,
    pub flock: FlockId,
}

impl AnimalDeath {
    pub fn new(date: NaiveDate, weight: f64, cause: impl Into<String>, flock: FlockId) -> DomainResult<Self> {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(DomainError::validation("weight must not be negative"));
        }
        Ok(Self {
            id: DeathId::new(),
            date,
            weight,
            cause: cause.into(),
            flock,
        })
    }
}

impl Entity for AnimalDeath {
    type Id = DeathId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A loading event: animals leaving the farm, possibly from several flocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalFarmExit {
    pub id: FarmExitId,
    pub date: NaiveDate,
    /// Total weight of all animals loaded (kg).
    pub weight: f64,
    pub number_of_animals: i64,
}

impl AnimalFarmExit {
    pub fn new(date: NaiveDate, weight: f64, number_of_animals: i64) -> DomainResult<Self> {
        if number_of_animals <= 0 {
            return Err(DomainError::validation("number of animals must be positive"));
        }
        if !(weight.is_finite() && weight > 0.0) {
            return Err(DomainError::validation("weight must be positive"));
        }
        Ok(Self {
            id: FarmExitId::new(),
            date,
            weight,
            number_of_animals,
        })
    }

    pub fn average_weight(&self) -> f64 {
        self.weight / self.number_of_animals as f64
    }
}

impl Entity for AnimalFarmExit {
    type Id = FarmExitId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// The share of a farm exit that belongs to one flock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalFlockExit {
    pub id: FlockExitId,
    pub farm_exit: Option<FarmExitId>,
    pub flock: FlockId,
    /// Copied from the farm exit.
    pub date: NaiveDate,
    pub number_of_animals: i64,
    pub weight: f64,
}

impl AnimalFlockExit {
    pub fn new(
        date: NaiveDate,
        flock: FlockId,
        number_of_animals: i64,
        weight: f64,
    ) -> DomainResult<Self> {
        if number_of_animals <= 0 {
            return Err(DomainError::validation("number of animals must be positive"));
        }
        if !(weight.is_finite() && weight > 0.0) {
            return Err(DomainError::validation("weight must be positive"));
        }
        Ok(Self {
            id: FlockExitId::new(),
            farm_exit: None,
            flock,
            date,
            number_of_animals,
            weight,
        })
    }

    /// Per-flock share of a farm exit, weighed at the exit's average weight.
    pub fn share_of(farm_exit: &AnimalFarmExit, flock: FlockId, number_of_animals: i64) -> DomainResult<Self> {
        let weight = farm_exit.average_weight() * number_of_animals as f64;
        let mut exit = Self::new(farm_exit.date, flock, number_of_animals, weight)?;
        exit.farm_exit = Some(farm_exit.id);
        Ok(exit)
    }

    pub fn average_weight(&self) -> f64 {
        self.weight / self.number_of_animals as f64
    }

    /// Daily weight gain between entry and this exit (kg/day).
    ///
    /// `None` when the exit is not after the flock's entry date.
    pub fn growth_rate(&self, flock: &Flock) -> Option<f64> {
        let days = (self.date - flock.entry_date).num_days();
        if days <= 0 {
            return None;
        }
        Some((self.average_weight() - flock.average_entry_weight()) / days as f64)
    }
}

impl Entity for AnimalFlockExit {
    type Id = FlockExitId;

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
    fn flock_share_uses_farm_average_weight() {
        let farm_exit = AnimalFarmExit::new(d(2017, 5, 1), 1100.0, 10).unwrap();
        let share = AnimalFlockExit::share_of(&farm_exit, FlockId::new(), 4).unwrap();
        assert_eq!(share.farm_exit, Some(farm_exit.id));
        assert_eq!(share.date, farm_exit.date);
        assert!((share.weight - 440.0).abs() < 1e-9);
    }

    #[test]
    fn growth_rate_spans_entry_to_exit() {
        let flock = Flock::new(d(2017, 1, 1), 10.0, 1).unwrap();
        let exit = AnimalFlockExit::new(d(2017, 4, 11), flock.id, 1, 100.0).unwrap();
        assert!((exit.growth_rate(&flock).unwrap() - 0.9).abs() < 1e-9);

        let same_day = AnimalFlockExit::new(d(2017, 1, 1), flock.id, 1, 100.0).unwrap();
        assert_eq!(same_day.growth_rate(&flock), None);
    }

    #[test]
    fn rejects_invalid_counts() {
        assert!(AnimalFarmExit::new(d(2017, 5, 1), 100.0, 0).is_err());
        assert!(AnimalFlockExit::new(d(2017, 5, 1), FlockId::new(), -1, 10.0).is_err());
        assert!(AnimalDeath::new(d(2017, 5, 1), -1.0, "", FlockId::new()).is_err());
    }
}
