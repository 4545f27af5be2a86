//! Batches of record changes committed as one unit.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use farmledger_buildings::RoomLedger;
use farmledger_core::{FlockId, RoomId};
use farmledger_flocks::FlockPopulation;

use super::records::{FarmData, Record, RecordKey};
use super::r#trait::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    Insert { record: Record },
    Update { record: Record },
    Delete { key: RecordKey },
}

/// Ordered list of changes; later changes see the effect of earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: impl Into<Record>) -> &mut Self {
        self.changes.push(Change::Insert {
            record: record.into(),
        });
        self
    }

    pub fn update(&mut self, record: impl Into<Record>) -> &mut Self {
        self.changes.push(Change::Update {
            record: record.into(),
        });
        self
    }

    pub fn delete(&mut self, key: RecordKey) -> &mut Self {
        self.changes.push(Change::Delete { key });
        self
    }

    pub fn extend(&mut self, other: ChangeSet) -> &mut Self {
        self.changes.extend(other.changes);
        self
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Records inserted by this change set, in order.
    pub fn inserted(&self) -> impl Iterator<Item = &Record> {
        self.changes.iter().filter_map(|c| match c {
            Change::Insert { record } => Some(record),
            _ => None,
        })
    }

    /// Apply every change to `data` and verify the ledger afterwards.
    ///
    /// On error `data` is left partially modified; callers apply to a copy.
    pub fn apply_to(&self, data: &mut FarmData) -> Result<(), StoreError> {
        let mut touched = Touched::default();
        for change in &self.changes {
            match change {
                Change::Insert { record } => {
                    touched.note(record);
                    data.insert(record.clone())?;
                }
                Change::Update { record } => {
                    touched.note(record);
                    data.update(record.clone())?;
                }
                Change::Delete { key } => {
                    touched.note_key(data, key);
                    data.delete(*key)?;
                }
            }
        }
        touched.verify(data)
    }
}

/// Rooms and flocks whose ledgers a change set may have altered.
#[derive(Debug, Default)]
struct Touched {
    rooms: BTreeSet<RoomId>,
    flocks: BTreeSet<FlockId>,
}

impl Touched {
    fn note(&mut self, record: &Record) {
        match record {
            Record::RoomEntry(e) => {
                self.rooms.insert(e.room);
                self.flocks.insert(e.flock);
            }
            Record::RoomExit(e) => {
                self.rooms.insert(e.room);
                self.flocks.insert(e.flock);
            }
            Record::Death(d) => {
                self.flocks.insert(d.flock);
            }
            Record::FlockExit(e) => {
                self.flocks.insert(e.flock);
            }
            Record::Flock(f) => {
                self.flocks.insert(f.id);
            }
            _ => {}
        }
    }

    /// Deleted flocks need no check; deleted movements change their room.
    fn note_key(&mut self, data: &FarmData, key: &RecordKey) {
        match key {
            RecordKey::RoomEntry(id) => {
                if let Some(e) = data.room_entries.iter().find(|e| e.id == *id) {
                    self.rooms.insert(e.room);
                }
            }
            RecordKey::RoomExit(id) => {
                if let Some(e) = data.room_exits.iter().find(|e| e.id == *id) {
                    self.rooms.insert(e.room);
                }
            }
            _ => {}
        }
    }

    fn verify(&self, data: &FarmData) -> Result<(), StoreError> {
        for room in &self.rooms {
            if !data.rooms.iter().any(|r| r.id == *room) {
                return Err(StoreError::Rejected(format!("movement references unknown room {room}")));
            }
            let ledger = RoomLedger::new(
                *room,
                data.room_entries.iter().cloned(),
                data.room_exits.iter().cloned(),
            );
            verify_room(&ledger)?;
        }

        for flock_id in &self.flocks {
            let Some(flock) = data.flocks.iter().find(|f| f.id == *flock_id) else {
                let referenced = data.room_entries.iter().any(|e| e.flock == *flock_id)
                    || data.room_exits.iter().any(|e| e.flock == *flock_id)
                    || data.deaths.iter().any(|d| d.flock == *flock_id)
                    || data.flock_exits.iter().any(|e| e.flock == *flock_id);
                if referenced {
                    return Err(StoreError::Rejected(format!("record references unknown flock {flock_id}")));
                }
                continue;
            };
            FlockPopulation::new(flock, &data.deaths, &data.flock_exits, &data.separations)
                .check()
                .map_err(|e| StoreError::Rejected(e.to_string()))?;
        }
        Ok(())
    }
}

/// Neither the room nor any flock in it may drop below zero animals.
fn verify_room(ledger: &RoomLedger) -> Result<(), StoreError> {
    let dates: BTreeSet<_> = ledger
        .entries()
        .iter()
        .map(|e| e.date)
        .chain(ledger.exits().iter().map(|e| e.date))
        .collect();
    let flocks: BTreeSet<_> = ledger.exits().iter().map(|e| e.flock).collect();

    for date in dates {
        let level = ledger.occupancy_at(date);
        if level < 0 {
            return Err(StoreError::Rejected(format!(
                "room {} would hold {level} animals on {date}",
                ledger.room()
            )));
        }
        for flock in &flocks {
            let animals = ledger.animals_for_flock(*flock, date);
            if animals < 0 {
                return Err(StoreError::Rejected(format!(
                    "more animals of flock {flock} removed from room {} than present on {date}",
                    ledger.room()
                )));
            }
        }
    }
    Ok(())
}
