//! Append-only movement ledger (mechanics only).
//!
//! Occupancy of a room or flock is never stored; it is always derived from
//! dated entry (+N) and exit (-N) movements. This crate holds the pure
//! accumulation logic shared by every module that needs head counts over time.

pub mod movement;
pub mod occupancy;
pub mod range;

pub use movement::{LedgerLine, Movement};
pub use occupancy::OccupancyLedger;
pub use range::DateRange;
