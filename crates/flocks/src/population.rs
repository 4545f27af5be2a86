//! Flock population accounting.

use chrono::NaiveDate;

use farmledger_core::{DomainError, DomainResult};
use farmledger_ledger::{LedgerLine, OccupancyLedger};

use crate::exit::{AnimalDeath, AnimalFlockExit};
use crate::flock::Flock;
use crate::growth::weighted_growth;
use crate::separation::AnimalSeparation;

/// A flock together with every record that reduced it.
///
/// Separated animals still belong to the flock: only deaths and flock exits
/// lower the living count.
#[derive(Debug, Clone)]
pub struct FlockPopulation<'a> {
    flock: &'a Flock,
    deaths: Vec<&'a AnimalDeath>,
    exits: Vec<&'a AnimalFlockExit>,
    separations: Vec<&'a AnimalSeparation>,
    ledger: OccupancyLedger,
}

impl<'a> FlockPopulation<'a> {
    /// Collect the records of `flock`; records of other flocks are skipped.
    pub fn new(
        flock: &'a Flock,
        deaths: impl IntoIterator<Item = &'a AnimalDeath>,
        exits: impl IntoIterator<Item = &'a AnimalFlockExit>,
        separations: impl IntoIterator<Item = &'a AnimalSeparation>,
    ) -> Self {
        let deaths: Vec<_> = deaths.into_iter().filter(|d| d.flock == flock.id).collect();
        let exits: Vec<_> = exits.into_iter().filter(|e| e.flock == flock.id).collect();
        let separations: Vec<_> = separations
            .into_iter()
            .filter(|s| s.flock == flock.id)
            .collect();

        let mut lines = vec![LedgerLine::entry(flock.entry_date, flock.number_of_animals)];
        lines.extend(exits.iter().map(|e| LedgerLine::exit(e.date, e.number_of_animals)));
        lines.extend(deaths.iter().map(|d| LedgerLine::exit(d.date, 1)));
        let ledger = OccupancyLedger::from_movements(&lines);

        Self {
            flock,
            deaths,
            exits,
            separations,
            ledger,
        }
    }

    pub fn flock(&self) -> &'a Flock {
        self.flock
    }

    pub fn deaths(&self) -> &[&'a AnimalDeath] {
        &self.deaths
    }

    pub fn exits(&self) -> &[&'a AnimalFlockExit] {
        &self.exits
    }

    pub fn death_count(&self) -> i64 {
        self.deaths.len() as i64
    }

    pub fn exited_animals(&self) -> i64 {
        self.exits.iter().map(|e| e.number_of_animals).sum()
    }

    /// Entered minus exited minus dead, regardless of dates.
    pub fn living_animals(&self) -> i64 {
        self.flock.number_of_animals - self.exited_animals() - self.death_count()
    }

    /// Living animals as of `at`; zero before the entry date.
    pub fn living_at(&self, at: NaiveDate) -> i64 {
        self.ledger.occupancy_at(at)
    }

    pub fn animal_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        self.ledger.animal_days(start, end)
    }

    /// Fails when more animals left the flock than ever entered it.
    pub fn check(&self) -> DomainResult<()> {
        let living = self.living_animals();
        if living < 0 {
            return Err(DomainError::invariant(format!(
                "flock {} has {living} living animals",
                self.flock.name()
            )));
        }
        Ok(())
    }

    pub fn death_percentage(&self) -> f64 {
        self.death_count() as f64 / self.flock.number_of_animals as f64 * 100.0
    }

    pub fn active_separations(&self) -> i64 {
        self.separations.iter().filter(|s| s.active()).count() as i64
    }

    pub fn separation_percentage(&self) -> f64 {
        self.active_separations() as f64 / self.flock.number_of_animals as f64 * 100.0
    }

    /// Animal-weighted daily growth over this flock's exits; `None` without exits.
    pub fn computed_daily_growth(&self) -> Option<f64> {
        weighted_growth(
            self.exits
                .iter()
                .filter_map(|e| e.growth_rate(self.flock).map(|g| (g, e.number_of_animals))),
        )
    }
}
