//! Infrastructure layer: farm store, configuration, the `FarmLedger`
//! service and the multi-step data entry wizards.

pub mod config;
pub mod kpis;
pub mod ledger;
pub mod store;
pub mod view;
pub mod wizards;


pub use config::{ConfigError, FarmConfig};
pub use ledger::{FarmLedger, LedgerError, LedgerResult};
pub use store::{ChangeSet, FarmData, FarmStore, InMemoryFarmStore, Record, RecordKey, StoreError};
pub use view::FarmView;
pub use wizards::{FormErrors, Wizard, WizardError};
