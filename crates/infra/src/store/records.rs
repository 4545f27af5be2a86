//! Every record kind the farm store holds, and the snapshot that holds them.

use serde::{Deserialize, Serialize};

use farmledger_buildings::{
    AnimalRoomEntry, AnimalRoomExit, AnimalRoomTransfer, AnimalSeparatedFromRoom, DeathInRoom,
    Room, RoomGroup, Silo,
};
use farmledger_core::{
    ApplicationId, DeathId, Entity, FarmExitId, FeedDeliveryId, FeedTypeId, FeedingChangeId,
    FlockExitId, FlockId, MedicineDiscardId, MedicineEntryId, MedicineId, RoomEntryId, RoomExitId,
    RoomGroupId, RoomId, SeparationId, SiloId, TransferId, TreatmentId,
};
use farmledger_feeding::{FeedDelivery, FeedType, RoomFeedingChange};
use farmledger_flocks::{AnimalDeath, AnimalFarmExit, AnimalFlockExit, AnimalSeparation, Flock};
use farmledger_medications::{
    Medicine, MedicineApplication, MedicineDiscard, MedicineEntry, Treatment,
};

use super::r#trait::StoreError;

/// Declares `Record`, `RecordKey` and the `FarmData` table layout in one go.
macro_rules! farm_records {
    ($($variant:ident($ty:ty, $id:ty) => $table:ident),* $(,)?) => {
        /// One stored row of any kind.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "record", rename_all = "snake_case")]
        pub enum Record {
            $($variant($ty)),*
        }

        /// Identity of a stored row.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "id", rename_all = "snake_case")]
        pub enum RecordKey {
            $($variant($id)),*
        }

        impl Record {
            pub fn key(&self) -> RecordKey {
                match self {
                    $(Record::$variant(r) => RecordKey::$variant(r.id())),*
                }
            }
        }

        $(
            impl From<$ty> for Record {
                fn from(value: $ty) -> Self {
                    Record::$variant(value)
                }
            }
        )*

        /// Full farm state. Doubles as the JSON snapshot format.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct FarmData {
            $(pub $table: Vec<$ty>),*
        }

        impl FarmData {
            pub(crate) fn insert(&mut self, record: Record) -> Result<(), StoreError> {
                match record {
                    $(Record::$variant(r) => {
                        if self.$table.iter().any(|x| x.id() == r.id()) {
                            return Err(StoreError::Duplicate(format!("{:?}", RecordKey::$variant(r.id()))));
                        }
                        self.$table.push(r);
                    }),*
                }
                Ok(())
            }

            pub(crate) fn update(&mut self, record: Record) -> Result<(), StoreError> {
                match record {
                    $(Record::$variant(r) => {
                        let slot = self
                            .$table
                            .iter_mut()
                            .find(|x| x.id() == r.id())
                            .ok_or_else(|| StoreError::NotFound(format!("{:?}", RecordKey::$variant(r.id()))))?;
                        *slot = r;
                    }),*
                }
                Ok(())
            }

            pub(crate) fn delete(&mut self, key: RecordKey) -> Result<(), StoreError> {
                match key {
                    $(RecordKey::$variant(id) => {
                        let before = self.$table.len();
                        self.$table.retain(|x| x.id() != id);
                        if self.$table.len() == before {
                            return Err(StoreError::NotFound(format!("{key:?}")));
                        }
                    }),*
                }
                Ok(())
            }

            /// Number of rows over all tables.
            pub fn len(&self) -> usize {
                0 $(+ self.$table.len())*
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }
        }
    };
}

farm_records! {
    RoomGroup(RoomGroup, RoomGroupId) => room_groups,
    Room(Room, RoomId) => rooms,
    Silo(Silo, SiloId) => silos,
    Flock(Flock, FlockId) => flocks,
    RoomEntry(AnimalRoomEntry, RoomEntryId) => room_entries,
    RoomExit(AnimalRoomExit, RoomExitId) => room_exits,
    Transfer(AnimalRoomTransfer, TransferId) => transfers,
    Death(AnimalDeath, DeathId) => deaths,
    DeathInRoom(DeathInRoom, DeathId) => deaths_in_room,
    FarmExit(AnimalFarmExit, FarmExitId) => farm_exits,
    FlockExit(AnimalFlockExit, FlockExitId) => flock_exits,
    Separation(AnimalSeparation, SeparationId) => separations,
    SeparatedFromRoom(AnimalSeparatedFromRoom, SeparationId) => separated_from_room,
    FeedType(FeedType, FeedTypeId) => feed_types,
    FeedDelivery(FeedDelivery, FeedDeliveryId) => feed_deliveries,
    FeedingChange(RoomFeedingChange, FeedingChangeId) => feeding_changes,
    Medicine(Medicine, MedicineId) => medicines,
    MedicineEntry(MedicineEntry, MedicineEntryId) => medicine_entries,
    MedicineDiscard(MedicineDiscard, MedicineDiscardId) => medicine_discards,
    Treatment(Treatment, TreatmentId) => treatments,
    Application(MedicineApplication, ApplicationId) => applications,
}
