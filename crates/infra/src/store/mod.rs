//! Farm record storage boundary.
//!
//! This module defines the repository abstraction the services read from
//! and commit to, without making any storage assumptions.

pub mod change_set;
pub mod in_memory;
pub mod records;
pub mod r#trait;

pub use change_set::{Change, ChangeSet};
pub use in_memory::InMemoryFarmStore;
pub use records::{FarmData, Record, RecordKey};
pub use r#trait::{FarmStore, StoreError};
