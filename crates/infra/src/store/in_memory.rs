use std::sync::{Arc, RwLock};

use super::change_set::ChangeSet;
use super::records::FarmData;
use super::r#trait::{FarmStore, StoreError};

#[derive(Debug, Default)]
struct State {
    data: Arc<FarmData>,
    revision: u64,
}

/// In-memory farm store.
///
/// Commits are applied to a private copy under the write lock and swapped
/// in only when every change succeeded, so readers never observe half a
/// change set. Intended for tests, the CLI and embedding.
#[derive(Debug, Default)]
pub struct InMemoryFarmStore {
    state: RwLock<State>,
}

impl InMemoryFarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously exported data (e.g. a JSON snapshot).
    pub fn from_snapshot(data: FarmData) -> Self {
        Self {
            state: RwLock::new(State {
                data: Arc::new(data),
                revision: 0,
            }),
        }
    }
}

impl FarmStore for InMemoryFarmStore {
    fn snapshot(&self) -> Result<Arc<FarmData>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(Arc::clone(&state.data))
    }

    fn commit(&self, changes: ChangeSet) -> Result<u64, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        if changes.is_empty() {
            return Ok(state.revision);
        }

        let mut next = FarmData::clone(&state.data);
        changes.apply_to(&mut next)?;

        state.data = Arc::new(next);
        state.revision += 1;
        Ok(state.revision)
    }

    fn revision(&self) -> Result<u64, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(state.revision)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use farmledger_buildings::{AnimalRoomEntry, AnimalRoomExit, Room, RoomGroup};
    use farmledger_core::{FlockId, RoomId};
    use farmledger_flocks::Flock;

    use super::*;
    use crate::store::RecordKey;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
    }

    fn seeded() -> (InMemoryFarmStore, Room, Flock) {
        let store = InMemoryFarmStore::new();
        let building = RoomGroup::building("Stable 1", None).unwrap();
        let room = Room::new("Room 1", 50, building.id, false).unwrap();
        let flock = Flock::new(d(1), 200.0, 10).unwrap();
        let entry = AnimalRoomEntry::new(d(1), 10, flock.id, room.id).unwrap();

        let mut changes = ChangeSet::new();
        changes
            .insert(building)
            .insert(room.clone())
            .insert(flock.clone())
            .insert(entry);
        store.commit(changes).unwrap();
        (store, room, flock)
    }

    #[test]
    fn commit_bumps_revision_and_publishes_snapshot() {
        let (store, room, _) = seeded();
        assert_eq!(store.revision().unwrap(), 1);
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.rooms, vec![room]);
        assert_eq!(snapshot.room_entries.len(), 1);
    }

    #[test]
    fn failing_change_set_leaves_store_untouched() {
        let (store, room, flock) = seeded();
        let before = store.snapshot().unwrap();

        let mut changes = ChangeSet::new();
        changes
            .insert(AnimalRoomExit::new(d(2), room.id, 3, flock.id).unwrap())
            .insert(AnimalRoomExit::new(d(3), room.id, 8, flock.id).unwrap());
        let err = store.commit(changes).unwrap_err();

        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(store.snapshot().unwrap(), before);
        assert_eq!(store.revision().unwrap(), 1);
    }

    #[test]
    fn movements_must_reference_known_rows() {
        let (store, _, flock) = seeded();
        let mut changes = ChangeSet::new();
        changes.insert(AnimalRoomEntry::new(d(2), 1, flock.id, RoomId::new()).unwrap());
        assert!(store.commit(changes).is_err());

        let (store, room, _) = seeded();
        let mut changes = ChangeSet::new();
        changes.insert(AnimalRoomEntry::new(d(2), 1, FlockId::new(), room.id).unwrap());
        assert!(store.commit(changes).is_err());
    }

    #[test]
    fn duplicate_inserts_and_missing_deletes_fail() {
        let (store, room, _) = seeded();
        let mut changes = ChangeSet::new();
        changes.insert(room);
        assert!(matches!(store.commit(changes), Err(StoreError::Duplicate(_))));

        let mut changes = ChangeSet::new();
        changes.delete(RecordKey::Flock(FlockId::new()));
        assert!(matches!(store.commit(changes), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn empty_commit_is_a_no_op() {
        let (store, _, _) = seeded();
        assert_eq!(store.commit(ChangeSet::new()).unwrap(), 1);
    }
}
