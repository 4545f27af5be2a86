//! Strongly-typed identifiers used across the farm domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_ids {
    ($($(#[$meta:meta])* $t:ident => $name:literal;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $t(Uuid);

            impl $t {
                /// Create a new identifier.
                ///
                /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
                /// for determinism.
                pub fn new() -> Self {
                    Self(Uuid::now_v7())
                }

                pub fn from_uuid(uuid: Uuid) -> Self {
                    Self(uuid)
                }

                pub fn as_uuid(&self) -> &Uuid {
                    &self.0
                }
            }

            impl Default for $t {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl core::fmt::Display for $t {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    core::fmt::Display::fmt(&self.0, f)
                }
            }

            impl From<Uuid> for $t {
                fn from(value: Uuid) -> Self {
                    Self(value)
                }
            }

            impl From<$t> for Uuid {
                fn from(value: $t) -> Self {
                    value.0
                }
            }

            impl FromStr for $t {
                type Err = DomainError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    let uuid = Uuid::from_str(s)
                        .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                    Ok(Self(uuid))
                }
            }
        )+
    };
}

uuid_ids! {
    /// A cohort of animals entering the farm together.
    FlockId => "FlockId";
    /// A group of rooms; a group without a parent is a building.
    RoomGroupId => "RoomGroupId";
    RoomId => "RoomId";
    SiloId => "SiloId";
    FeedTypeId => "FeedTypeId";
    FeedDeliveryId => "FeedDeliveryId";
    FeedingChangeId => "FeedingChangeId";
    RoomEntryId => "RoomEntryId";
    RoomExitId => "RoomExitId";
    TransferId => "TransferId";
    DeathId => "DeathId";
    /// A loading/sale event, possibly spanning several flocks.
    FarmExitId => "FarmExitId";
    /// The share of a farm exit taken from one flock.
    FlockExitId => "FlockExitId";
    SeparationId => "SeparationId";
    MedicineId => "MedicineId";
    MedicineEntryId => "MedicineEntryId";
    MedicineDiscardId => "MedicineDiscardId";
    TreatmentId => "TreatmentId";
    ApplicationId => "ApplicationId";
}

/// Buildings are top-level room groups and share their identifier space.
pub type BuildingId = RoomGroupId;
