//! Buildings domain module: spatial containers and the movements between them.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod layout;
pub mod movement;
pub mod room_ledger;

pub use layout::{Layout, Room, RoomGroup, Silo, validate_name};
pub use movement::{
    AnimalRoomEntry, AnimalRoomExit, AnimalRoomTransfer, AnimalSeparatedFromRoom, DeathInRoom,
};
pub use room_ledger::RoomLedger;
