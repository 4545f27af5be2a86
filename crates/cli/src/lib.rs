//! Farm status report built from an exported snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;

use farmledger_core::FlockId;
use farmledger_flocks::Kpi;
use farmledger_infra::{FarmConfig, FarmData, FarmLedger, FarmStore, LedgerResult};
use farmledger_observability::LogFormat;

/// Print occupancy, feed estimates and KPIs of a farm snapshot as JSON.
#[derive(Parser, Debug)]
#[command(name = "farmledger-report")]
pub struct Args {
    /// JSON snapshot of the farm records
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Report date (YYYY-MM-DD), defaults to today
    #[arg(value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// JSON configuration file; otherwise FARMLEDGER_* variables apply
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log output format (json or pretty)
    #[arg(long, env = "FARMLEDGER_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl Args {
    pub fn load_config(&self) -> anyhow::Result<FarmConfig> {
        let mut config = match &self.config {
            Some(path) => FarmConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => FarmConfig::from_env().context("reading FARMLEDGER_* variables")?,
        };
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

pub fn load_snapshot(path: &Path) -> anyhow::Result<FarmData> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomReport {
    pub room: String,
    pub capacity: i64,
    pub is_separation: bool,
    pub occupancy: i64,
    pub flocks: BTreeMap<FlockId, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedReport {
    pub building: String,
    pub feed_type: String,
    pub capacity: f64,
    pub average_consumption: Option<f64>,
    pub remaining: Option<f64>,
    pub depletion_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmReport {
    pub date: NaiveDate,
    pub rooms: Vec<RoomReport>,
    pub feed: Vec<FeedReport>,
    pub kpis: Vec<Kpi>,
}

/// Everything the report shows, as of `date`.
pub fn build_report<S: FarmStore>(ledger: &FarmLedger<S>, date: NaiveDate) -> LedgerResult<FarmReport> {
    let data = ledger.snapshot()?;

    let rooms = ledger.read(|view| {
        let layout = view.layout();
        data.rooms
            .iter()
            .map(|room| RoomReport {
                room: layout.room_label(room),
                capacity: room.capacity,
                is_separation: room.is_separation,
                occupancy: view.occupancy(room.id, date),
                flocks: view.flocks_present(room.id, date),
            })
            .collect::<Vec<_>>()
    })?;

    let mut feed = Vec::new();
    for building in data.room_groups.iter().filter(|g| g.is_building()) {
        for feed_type in &data.feed_types {
            let capacity = ledger.feed_capacity(building.id, feed_type.id)?;
            if capacity <= 0.0 {
                continue;
            }
            feed.push(FeedReport {
                building: building.name.clone(),
                feed_type: feed_type.name.clone(),
                capacity,
                average_consumption: ledger.average_feed_consumption(building.id, date, feed_type.id)?,
                remaining: ledger.remaining_feed(building.id, date, feed_type.id)?,
                depletion_date: ledger.estimated_depletion_date(building.id, date, feed_type.id)?,
            });
        }
    }

    Ok(FarmReport {
        date,
        rooms,
        feed,
        kpis: ledger.farm_kpis(date)?,
    })
}
