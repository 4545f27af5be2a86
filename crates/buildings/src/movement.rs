//! Room movement rows: the append-only ledger every head count derives from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use farmledger_core::{
    DeathId, DomainError, DomainResult, Entity, FarmExitId, FlockId, RoomEntryId, RoomExitId,
    RoomId, SeparationId, TransferId,
};
use farmledger_ledger::Movement;

/// Animals of one flock placed into a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRoomEntry {
    pub id: RoomEntryId,
    pub date: NaiveDate,
    pub number_of_animals: i64,
    pub flock: FlockId,
    pub room: RoomId,
}

impl AnimalRoomEntry {
    pub fn new(
        date: NaiveDate,
        number_of_animals: i64,
        flock: FlockId,
        room: RoomId,
    ) -> DomainResult<Self> {
        ensure_positive(number_of_animals)?;
        Ok(Self {
            id: RoomEntryId::new(),
            date,
            number_of_animals,
            flock,
            room,
        })
    }
}

impl Movement for AnimalRoomEntry {
    fn movement_date(&self) -> NaiveDate {
        self.date
    }

    fn signed_count(&self) -> i64 {
        self.number_of_animals
    }
}

impl Entity for AnimalRoomEntry {
    type Id = RoomEntryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Animals of one flock leaving a room (transfer, separation, death or farm exit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRoomExit {
    pub id: RoomExitId,
    pub date: NaiveDate,
    pub room: RoomId,
    pub number_of_animals: i64,
    pub flock: FlockId,
    /// Set when the animals left the farm altogether.
    pub farm_exit: Option<FarmExitId>,
}

impl AnimalRoomExit {
    pub fn new(
        date: NaiveDate,
        room: RoomId,
        number_of_animals: i64,
        flock: FlockId,
    ) -> DomainResult<Self> {
        ensure_positive(number_of_animals)?;
        Ok(Self {
            id: RoomExitId::new(),
            date,
            room,
            number_of_animals,
            flock,
            farm_exit: None,
        })
    }

    pub fn with_farm_exit(mut self, farm_exit: FarmExitId) -> Self {
        self.farm_exit = Some(farm_exit);
        self
    }
}

impl Movement for AnimalRoomExit {
    fn movement_date(&self) -> NaiveDate {
        self.date
    }

    fn signed_count(&self) -> i64 {
        -self.number_of_animals
    }
}

impl Entity for AnimalRoomExit {
    type Id = RoomExitId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Links one room exit to the single room entry a transfer fed; a transfer
/// from several rooms has one link per exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRoomTransfer {
    pub id: TransferId,
    pub room_entry: RoomEntryId,
    pub room_exit: RoomExitId,
}

impl Entity for AnimalRoomTransfer {
    type Id = TransferId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Statistics only: the room a death happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathInRoom {
    pub death: DeathId,
    pub room: RoomId,
}

impl Entity for DeathInRoom {
    type Id = DeathId;

    fn id(&self) -> Self::Id {
        self.death
    }
}

/// Statistics only: where a separated animal came from and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalSeparatedFromRoom {
    pub separation: SeparationId,
    pub room: RoomId,
    pub destination: Option<RoomId>,
}

impl Entity for AnimalSeparatedFromRoom {
    type Id = SeparationId;

    fn id(&self) -> Self::Id {
        self.separation
    }
}

fn ensure_positive(number_of_animals: i64) -> DomainResult<()> {
    if number_of_animals <= 0 {
        return Err(DomainError::validation(
            "number of animals must be positive",
        ));
    }
    Ok(())
}
