//! `farmledger-core` - domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    ApplicationId, BuildingId, DeathId, FarmExitId, FeedDeliveryId, FeedTypeId, FeedingChangeId,
    FlockExitId, FlockId, MedicineDiscardId, MedicineEntryId, MedicineId, RoomEntryId, RoomExitId,
    RoomGroupId, RoomId, SeparationId, SiloId, TransferId, TreatmentId,
};
