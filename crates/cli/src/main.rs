use anyhow::Context;
use clap::Parser;

use farmledger_cli::{Args, build_report, load_snapshot};
use farmledger_infra::{FarmLedger, InMemoryFarmStore};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;
    farmledger_observability::tracing::init(config.log_format);

    let data = load_snapshot(&args.snapshot)?;
    tracing::info!(snapshot = %args.snapshot.display(), records = data.len(), "snapshot loaded");

    let date = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let ledger = FarmLedger::new(InMemoryFarmStore::from_snapshot(data), config);
    let report = build_report(&ledger, date).context("building report")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
