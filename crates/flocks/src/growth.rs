//! Growth estimation: daily weight gain and the exit date it implies.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::flock::Flock;

/// Farm-wide growth assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthParameters {
    /// Daily gain assumed when no exit history exists (kg/day).
    pub default_daily_growth: f64,
    /// Weight at which animals are ready to leave the farm (kg).
    pub target_exit_weight: f64,
    /// How far before a flock's entry past exits are considered (days).
    pub history_days: u64,
}

impl Default for GrowthParameters {
    fn default() -> Self {
        Self {
            default_daily_growth: 0.850,
            target_exit_weight: 115.0,
            history_days: 365,
        }
    }
}

impl GrowthParameters {
    /// `growth` if it is a usable rate, the configured default otherwise.
    pub fn effective_growth(&self, growth: Option<f64>) -> f64 {
        growth
            .filter(|g| g.is_finite() && *g > 0.0)
            .unwrap_or(self.default_daily_growth)
    }
}

/// Animal-weighted mean of `(growth_rate, number_of_animals)` samples.
///
/// Returns `None` when no animals contribute.
pub fn weighted_growth(samples: impl IntoIterator<Item = (f64, i64)>) -> Option<f64> {
    let (weighted, animals) = samples
        .into_iter()
        .fold((0.0, 0i64), |(weighted, animals), (rate, n)| {
            (weighted + rate * n as f64, animals + n)
        });
    (animals > 0).then(|| weighted / animals as f64)
}

/// Date at which the flock reaches the target exit weight.
///
/// `growth` is the historic daily gain; a missing or non-positive value falls
/// back to the default.
pub fn expected_exit_date(flock: &Flock, growth: Option<f64>, params: &GrowthParameters) -> NaiveDate {
    let rate = params.effective_growth(growth);
    let growing_days = ((params.target_exit_weight - flock.average_entry_weight()) / rate).ceil();
    let growing_days = if growing_days.is_finite() && growing_days > 0.0 {
        growing_days as u64
    } else {
        0
    };
    flock
        .entry_date
        .checked_add_days(Days::new(growing_days))
        .unwrap_or(NaiveDate::MAX)
}

/// Estimated average weight of the flock's animals at `at` (kg).
pub fn estimated_weight(flock: &Flock, at: NaiveDate, growth: Option<f64>, params: &GrowthParameters) -> f64 {
    let days = flock.age_at(at).max(0) as f64;
    flock.average_entry_weight() + params.effective_growth(growth) * days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn exit_date_with_default_growth() {
        // 20 kg per animal, (115 - 20) / 0.85 = 111.8 -> 112 days.
        let flock = Flock::new(d(2017, 1, 1), 2600.0, 130).unwrap();
        let params = GrowthParameters::default();
        assert_eq!(expected_exit_date(&flock, None, &params), d(2017, 4, 23));
    }

    #[test]
    fn exit_date_uses_history_when_known() {
        let flock = Flock::new(d(2017, 1, 1), 2000.0, 100).unwrap();
        let params = GrowthParameters::default();
        // (115 - 20) / 1.0 = 95 days.
        assert_eq!(expected_exit_date(&flock, Some(1.0), &params), d(2017, 4, 6));
        assert_eq!(
            expected_exit_date(&flock, Some(0.0), &params),
            expected_exit_date(&flock, None, &params)
        );
    }

    #[test]
    fn heavy_flocks_are_ready_on_entry() {
        let flock = Flock::new(d(2017, 1, 1), 12000.0, 100).unwrap();
        assert_eq!(
            expected_exit_date(&flock, None, &GrowthParameters::default()),
            flock.entry_date
        );
    }

    #[test]
    fn weighted_growth_weights_by_animals() {
        assert_eq!(weighted_growth(std::iter::empty()), None);
        let growth = weighted_growth([(1.0, 1), (2.0, 3)]).unwrap();
        assert!((growth - 1.75).abs() < 1e-9);
    }

    #[test]
    fn estimated_weight_grows_linearly() {
        let flock = Flock::new(d(2017, 1, 1), 2000.0, 100).unwrap();
        let params = GrowthParameters::default();
        let w = estimated_weight(&flock, d(2017, 1, 11), Some(1.0), &params);
        assert!((w - 30.0).abs() < 1e-9);
        let before = estimated_weight(&flock, d(2016, 12, 1), Some(1.0), &params);
        assert!((before - 20.0).abs() < 1e-9);
    }
}
