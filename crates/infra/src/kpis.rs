//! Farm-wide and per-flock KPI assembly.

use chrono::{Days, NaiveDate};

use farmledger_flocks::{Flock, Kpi};

use crate::view::FarmView;

/// Animals on farm, death and separation percentages of the flocks still
/// present, and the growth achieved by exits over the history window.
pub fn farm_kpis(view: &FarmView<'_>, today: NaiveDate) -> Vec<Kpi> {
    let thresholds = &view.config().kpi;
    let current = view.current_flocks();

    let living: i64 = current.iter().map(|p| p.living_animals()).sum();
    let entered: i64 = current.iter().map(|p| p.flock().number_of_animals).sum();
    let dead: i64 = current.iter().map(|p| p.death_count()).sum();
    let separated = view
        .data()
        .separations
        .iter()
        .filter(|s| s.active())
        .count() as i64;

    let mut kpis = vec![
        Kpi::farm_animals(living),
        Kpi::farm_death_percentage(percentage(dead, entered), thresholds),
        Kpi::farm_separation_percentage(percentage(separated, entered), thresholds),
    ];

    let since = today
        .checked_sub_days(Days::new(view.config().growth.history_days))
        .unwrap_or(NaiveDate::MIN);
    if let Some(growth) = view.historic_growth(since, today) {
        kpis.push(Kpi::growth_rate(growth, thresholds));
    }
    kpis
}

pub fn flock_kpis<'a>(view: &FarmView<'a>, flock: &'a Flock, today: NaiveDate) -> Vec<Kpi> {
    let thresholds = &view.config().kpi;
    let population = view.population(flock);

    vec![
        Kpi::living_animals(population.living_animals()),
        Kpi::estimated_weight(view.estimated_weight(flock, today)),
        Kpi::exit_date(view.expected_exit_date(flock), today, thresholds),
        Kpi::flock_death_percentage(population.death_percentage(), thresholds),
        Kpi::flock_separation_percentage(population.separation_percentage(), thresholds),
        Kpi::suggested_feed_type(
            view.suggested_feed_type(flock, today)
                .map(|t| t.name.as_str()),
        ),
    ]
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
