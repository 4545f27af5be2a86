use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farmledger_core::{DeathId, Entity, FlockExitId, FlockId, SeparationId};

/// An animal moved apart from its flock mates, usually because it is sick.
///
/// The separation stays active until the animal dies or leaves the farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalSeparation {
    pub id: SeparationId,
    pub date: NaiveDate,
    pub flock: FlockId,
    pub reason: String,
    pub death: Option<DeathId>,
    pub exit: Option<FlockExitId>,
}

impl AnimalSeparation {
    pub fn new(date: NaiveDate, flock: FlockId, reason: impl Into<String>) -> Self {
        Self {
            id: SeparationId::new(),
            date,
            flock,
            reason: reason.into(),
            death: None,
            exit: None,
        }
    }

    pub fn active(&self) -> bool {
        self.death.is_none() && self.exit.is_none()
    }
}

impl Entity for AnimalSeparation {
    type Id = SeparationId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_or_exit_closes_a_separation() {
        let date = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap();
        let mut separation = AnimalSeparation::new(date, FlockId::new(), "Sick.");
        assert!(separation.active());

        separation.death = Some(DeathId::new());
        assert!(!separation.active());

        separation.death = None;
        separation.exit = Some(FlockExitId::new());
        assert!(!separation.active());
    }
}
