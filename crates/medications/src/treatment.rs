use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use farmledger_core::{
    ApplicationId, DomainError, DomainResult, Entity, FlockId, MedicineId, TreatmentId,
};

/// A course of one medicine given to a flock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: TreatmentId,
    pub start_date: NaiveDate,
    pub stop_date: Option<NaiveDate>,
    pub medicine: MedicineId,
    pub flock: FlockId,
    pub comments: String,
}

impl Treatment {
    pub fn new(start_date: NaiveDate, medicine: MedicineId, flock: FlockId, comments: impl Into<String>) -> Self {
        Self {
            id: TreatmentId::new(),
            start_date,
            stop_date: None,
            medicine,
            flock,
            comments: comments.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.stop_date.is_none()
    }

    pub fn stop(&mut self, date: NaiveDate) -> DomainResult<()> {
        if let Some(stopped) = self.stop_date {
            return Err(DomainError::conflict(format!(
                "treatment already stopped on {stopped}"
            )));
        }
        if date < self.start_date {
            return Err(DomainError::validation(
                "stop date cannot precede the start date",
            ));
        }
        self.stop_date = Some(date);
        Ok(())
    }

    /// Last day of the withdrawal period: the latest application of this
    /// treatment plus the medicine's grace days, or the start date when
    /// nothing was applied yet.
    pub fn end_date_grace_period<'a>(
        &self,
        grace_period_days: u64,
        applications: impl IntoIterator<Item = &'a MedicineApplication>,
    ) -> NaiveDate {
        applications
            .into_iter()
            .filter(|a| a.treatment == self.id)
            .map(|a| a.date)
            .max()
            .and_then(|last| last.checked_add_days(Days::new(grace_period_days)))
            .unwrap_or(self.start_date)
    }
}

impl Entity for Treatment {
    type Id = TreatmentId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineApplication {
    pub id: ApplicationId,
    pub date: NaiveDate,
    pub dosage: f64,
    pub treatment: TreatmentId,
}

impl MedicineApplication {
    pub fn new(date: NaiveDate, dosage: f64, treatment: TreatmentId) -> DomainResult<Self> {
        if !(dosage.is_finite() && dosage > 0.0) {
            return Err(DomainError::validation("dosage must be positive"));
        }
        Ok(Self {
            id: ApplicationId::new(),
            date,
            dosage,
            treatment,
        })
    }
}

impl Entity for MedicineApplication {
    type Id = ApplicationId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
    }

    fn treatment() -> Treatment {
        Treatment::new(d(10), MedicineId::new(), FlockId::new(), "")
    }

    #[test]
    fn active_until_stopped() {
        let mut t = treatment();
        assert!(t.is_active());
        t.stop(d(15)).unwrap();
        assert!(!t.is_active());
        assert!(t.stop(d(16)).is_err());
    }

    #[test]
    fn cannot_stop_before_start() {
        let mut t = treatment();
        assert!(t.stop(d(9)).is_err());
        assert!(t.is_active());
    }

    #[test]
    fn grace_period_without_application_is_start_date() {
        let t = treatment();
        assert_eq!(t.end_date_grace_period(10, []), d(10));
    }

    #[test]
    fn grace_period_counts_from_last_application() {
        let t = treatment();
        let apps = [
            MedicineApplication::new(d(11), 10.0, t.id).unwrap(),
            MedicineApplication::new(d(10), 10.0, t.id).unwrap(),
            MedicineApplication::new(d(25), 10.0, TreatmentId::new()).unwrap(),
        ];
        assert_eq!(t.end_date_grace_period(10, &apps[1..2]), d(20));
        assert_eq!(t.end_date_grace_period(10, &apps), d(21));
    }
}
