use std::sync::Arc;

use thiserror::Error;

use super::change_set::ChangeSet;
use super::records::FarmData;

/// Store operation error.
///
/// These are **infrastructure errors** (missing rows, broken integrity,
/// unavailable storage) as opposed to domain errors raised while validating
/// user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// Applying the change set would leave the farm inconsistent.
    #[error("change set rejected: {0}")]
    Rejected(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Repository boundary for farm records.
///
/// Reads hand out an immutable snapshot; writes go through `commit`, which
/// applies a whole `ChangeSet` or nothing.
///
/// Implementations must:
/// - apply change sets atomically
/// - reject change sets that break the movement ledger (negative occupancy,
///   movements referencing unknown rooms or flocks)
/// - serialise commits so that each one sees the result of the previous
pub trait FarmStore: Send + Sync {
    /// Consistent view of the farm as of the latest commit.
    fn snapshot(&self) -> Result<Arc<FarmData>, StoreError>;

    /// Apply `changes` atomically; returns the new revision.
    fn commit(&self, changes: ChangeSet) -> Result<u64, StoreError>;

    /// Number of commits applied so far.
    fn revision(&self) -> Result<u64, StoreError>;
}

impl<S> FarmStore for Arc<S>
where
    S: FarmStore + ?Sized,
{
    fn snapshot(&self) -> Result<Arc<FarmData>, StoreError> {
        (**self).snapshot()
    }

    fn commit(&self, changes: ChangeSet) -> Result<u64, StoreError> {
        (**self).commit(changes)
    }

    fn revision(&self) -> Result<u64, StoreError> {
        (**self).revision()
    }
}
