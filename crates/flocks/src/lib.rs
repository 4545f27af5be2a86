//! Flocks domain module: animal cohorts and everything that reduces them.
//!
//! A flock enters the farm once; deaths, flock exits and separations are
//! recorded against it afterwards. Population figures and KPIs are derived,
//! never stored.

pub mod exit;
pub mod flock;
pub mod growth;
pub mod kpi;
pub mod population;
pub mod separation;

pub use exit::{AnimalDeath, AnimalFarmExit, AnimalFlockExit};
pub use flock::Flock;
pub use growth::{GrowthParameters, estimated_weight, expected_exit_date, weighted_growth};
pub use kpi::{Kpi, KpiLevel, KpiThresholds};
pub use population::FlockPopulation;
pub use separation::AnimalSeparation;
