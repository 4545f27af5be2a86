//! Key performance indicators for flocks and for the whole farm.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiLevel {
    /// Informational, no judgement attached.
    Primary,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub title: String,
    pub value: String,
    pub unit: String,
    pub level: KpiLevel,
}

/// Levels at which a KPI turns to warning or danger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiThresholds {
    pub flock_death_warning: f64,
    pub flock_death_danger: f64,
    pub flock_separation_warning: f64,
    pub flock_separation_danger: f64,
    pub farm_death_warning: f64,
    pub farm_death_danger: f64,
    pub farm_separation_warning: f64,
    pub farm_separation_danger: f64,
    /// Growth below this is a warning (kg/day).
    pub growth_warning: f64,
    /// Growth below this is a danger (kg/day).
    pub growth_danger: f64,
    /// Days before the expected exit date at which a flock is flagged.
    pub exit_date_warning_days: i64,
}

impl Default for KpiThresholds {
    fn default() -> Self {
        Self {
            flock_death_warning: 1.0,
            flock_death_danger: 2.0,
            flock_separation_warning: 1.0,
            flock_separation_danger: 2.0,
            farm_death_warning: 2.0,
            farm_death_danger: 5.0,
            farm_separation_warning: 1.0,
            farm_separation_danger: 2.0,
            growth_warning: 0.850,
            growth_danger: 0.700,
            exit_date_warning_days: 14,
        }
    }
}

impl Kpi {
    fn new(title: &str, value: String, unit: &str, level: KpiLevel) -> Self {
        Self {
            title: title.to_string(),
            value,
            unit: unit.to_string(),
            level,
        }
    }

    pub fn living_animals(count: i64) -> Self {
        Self::new("Number of animals on farm", count.to_string(), "", KpiLevel::Primary)
    }

    pub fn estimated_weight(kg: f64) -> Self {
        Self::new("Estimated average weight", format!("{kg:.2}"), "kg", KpiLevel::Primary)
    }

    /// Warning shortly before the expected exit, danger once it has passed.
    pub fn exit_date(expected: NaiveDate, today: NaiveDate, thresholds: &KpiThresholds) -> Self {
        let days_left = (expected - today).num_days();
        let level = if days_left < 0 {
            KpiLevel::Danger
        } else if days_left > 0 && days_left < thresholds.exit_date_warning_days {
            KpiLevel::Warning
        } else {
            KpiLevel::Success
        };
        Self::new("Expected exit date", expected.to_string(), "", level)
    }

    pub fn flock_death_percentage(percentage: f64, thresholds: &KpiThresholds) -> Self {
        let level = rising_level(
            percentage,
            thresholds.flock_death_warning,
            thresholds.flock_death_danger,
        );
        Self::new("Death percentage", format!("{percentage:.2}"), "%", level)
    }

    pub fn flock_separation_percentage(percentage: f64, thresholds: &KpiThresholds) -> Self {
        let level = rising_level(
            percentage,
            thresholds.flock_separation_warning,
            thresholds.flock_separation_danger,
        );
        Self::new("Animal separation", format!("{percentage:.2}"), "%", level)
    }

    pub fn suggested_feed_type(name: Option<&str>) -> Self {
        Self::new(
            "Suggested feed type",
            name.unwrap_or_default().to_string(),
            "",
            KpiLevel::Primary,
        )
    }

    pub fn farm_animals(count: i64) -> Self {
        Self::new("Animals on farm", count.to_string(), "", KpiLevel::Success)
    }

    pub fn farm_death_percentage(percentage: f64, thresholds: &KpiThresholds) -> Self {
        let level = rising_level(
            percentage,
            thresholds.farm_death_warning,
            thresholds.farm_death_danger,
        );
        Self::new("Death percentage", format!("{percentage:.2}"), "%", level)
    }

    pub fn farm_separation_percentage(percentage: f64, thresholds: &KpiThresholds) -> Self {
        let level = rising_level(
            percentage,
            thresholds.farm_separation_warning,
            thresholds.farm_separation_danger,
        );
        Self::new("Animal separation", format!("{percentage:.2}"), "%", level)
    }

    /// Growth is judged the other way round: lower is worse.
    pub fn growth_rate(growth: f64, thresholds: &KpiThresholds) -> Self {
        let level = if growth < thresholds.growth_danger {
            KpiLevel::Danger
        } else if growth < thresholds.growth_warning {
            KpiLevel::Warning
        } else {
            KpiLevel::Success
        };
        Self::new("Grow rate", format!("{growth:.2}"), "kg/day", level)
    }
}

fn rising_level(value: f64, warning: f64, danger: f64) -> KpiLevel {
    if value >= danger {
        KpiLevel::Danger
    } else if value >= warning {
        KpiLevel::Warning
    } else {
        KpiLevel::Success
    }
}
