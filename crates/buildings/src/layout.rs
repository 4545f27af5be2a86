use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use farmledger_core::{
    BuildingId, DomainError, DomainResult, Entity, FeedTypeId, RoomGroupId, RoomId, SiloId,
};

/// A named group of rooms and sub-groups.
///
/// A group without a parent is a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomGroup {
    pub id: RoomGroupId,
    pub name: String,
    pub parent: Option<RoomGroupId>,
    pub location: Option<String>,
}

impl RoomGroup {
    pub fn building(name: impl Into<String>, location: Option<String>) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: RoomGroupId::new(),
            name,
            parent: None,
            location,
        })
    }

    pub fn sub_group(name: impl Into<String>, parent: RoomGroupId) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: RoomGroupId::new(),
            name,
            parent: Some(parent),
            location: None,
        })
    }

    pub fn is_building(&self) -> bool {
        self.parent.is_none()
    }
}

impl Entity for RoomGroup {
    type Id = RoomGroupId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: i64,
    pub group: RoomGroupId,
    /// Separation rooms isolate sick or injured animals from their flock.
    pub is_separation: bool,
}

impl Room {
    pub fn new(
        name: impl Into<String>,
        capacity: i64,
        group: RoomGroupId,
        is_separation: bool,
    ) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        if capacity < 0 {
            return Err(DomainError::validation("room capacity cannot be negative"));
        }
        Ok(Self {
            id: RoomId::new(),
            name,
            capacity,
            group,
            is_separation,
        })
    }
}

impl Entity for Room {
    type Id = RoomId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Feed storage attached to a building; holds a single feed type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Silo {
    pub id: SiloId,
    pub name: String,
    /// Capacity in kg.
    pub capacity: f64,
    pub building: BuildingId,
    pub feed_type: FeedTypeId,
}

impl Silo {
    pub fn new(
        name: impl Into<String>,
        capacity: f64,
        building: BuildingId,
        feed_type: FeedTypeId,
    ) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(DomainError::validation("silo capacity must be positive"));
        }
        Ok(Self {
            id: SiloId::new(),
            name,
            capacity,
            building,
            feed_type,
        })
    }
}

impl Entity for Silo {
    type Id = SiloId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Trimmed record name; must be non-empty and at most 20 characters.
pub fn validate_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if trimmed.chars().count() > 20 {
        return Err(DomainError::validation("name cannot exceed 20 characters"));
    }
    Ok(trimmed.to_string())
}

/// Borrowed view over the farm's group/room tree.
///
/// Traversals tolerate malformed parent links: a group reached twice is
/// visited once.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    groups: &'a [RoomGroup],
    rooms: &'a [Room],
}

impl<'a> Layout<'a> {
    pub fn new(groups: &'a [RoomGroup], rooms: &'a [Room]) -> Self {
        Self { groups, rooms }
    }

    pub fn group(&self, id: RoomGroupId) -> Option<&'a RoomGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn room(&self, id: RoomId) -> Option<&'a Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &'a RoomGroup> + 'a {
        self.groups.iter().filter(|g| g.is_building())
    }

    /// `group` and every group nested below it.
    pub fn subtree(&self, group: RoomGroupId) -> Vec<RoomGroupId> {
        let mut seen = HashSet::from([group]);
        let mut out = vec![group];
        let mut idx = 0;
        while idx < out.len() {
            let current = out[idx];
            for child in self.groups.iter().filter(|g| g.parent == Some(current)) {
                if seen.insert(child.id) {
                    out.push(child.id);
                }
            }
            idx += 1;
        }
        out
    }

    /// Every room in `group`, including rooms of nested groups.
    pub fn rooms_in(&self, group: RoomGroupId) -> Vec<&'a Room> {
        let groups = self.subtree(group);
        self.rooms
            .iter()
            .filter(|r| groups.contains(&r.group))
            .collect()
    }

    pub fn number_of_rooms(&self, group: RoomGroupId) -> usize {
        self.rooms_in(group).len()
    }

    pub fn animal_capacity(&self, group: RoomGroupId) -> i64 {
        self.rooms_in(group).iter().map(|r| r.capacity).sum()
    }

    /// Sum of `occupancy(room)` over every room in `group`.
    pub fn occupancy(&self, group: RoomGroupId, occupancy: impl Fn(&Room) -> i64) -> i64 {
        self.rooms_in(group).into_iter().map(occupancy).sum()
    }

    /// The building (top-level group) a room belongs to.
    pub fn building_of(&self, room: RoomId) -> DomainResult<BuildingId> {
        let room = self
            .room(room)
            .ok_or_else(|| DomainError::not_found(format!("room {room}")))?;

        let mut seen = HashSet::new();
        let mut current = room.group;
        loop {
            if !seen.insert(current) {
                return Err(DomainError::invariant(format!(
                    "room group {current} is part of a parent cycle"
                )));
            }
            let group = self
                .group(current)
                .ok_or_else(|| DomainError::not_found(format!("room group {current}")))?;
            match group.parent {
                Some(parent) => current = parent,
                None => return Ok(group.id),
            }
        }
    }

    /// Display label `"<group> - <room>"`.
    pub fn room_label(&self, room: &Room) -> String {
        match self.group(room.group) {
            Some(group) => format!("{} - {}", group.name, room.name),
            None => room.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Farm {
        groups: Vec<RoomGroup>,
        rooms: Vec<Room>,
    }

    fn farm() -> Farm {
        let building = RoomGroup::building("Barn", Some("North field".into())).unwrap();
        let wing = RoomGroup::sub_group("West wing", building.id).unwrap();
        let rooms = vec![
            Room::new("Room1", 13, building.id, false).unwrap(),
            Room::new("Room2", 13, wing.id, false).unwrap(),
            Room::new("Sep", 4, wing.id, true).unwrap(),
        ];
        Farm {
            groups: vec![building, wing],
            rooms,
        }
    }

    #[test]
    fn nested_groups_roll_up_rooms_and_capacity() {
        let f = farm();
        let layout = Layout::new(&f.groups, &f.rooms);
        let building = f.groups[0].id;
        let wing = f.groups[1].id;

        assert_eq!(layout.number_of_rooms(building), 3);
        assert_eq!(layout.animal_capacity(building), 30);
        assert_eq!(layout.number_of_rooms(wing), 2);
        assert_eq!(layout.animal_capacity(wing), 17);
    }

    #[test]
    fn room_resolves_to_its_building() {
        let f = farm();
        let layout = Layout::new(&f.groups, &f.rooms);
        assert_eq!(layout.building_of(f.rooms[2].id).unwrap(), f.groups[0].id);
        assert_eq!(layout.room_label(&f.rooms[2]), "West wing - Sep");
    }

    #[test]
    fn group_occupancy_sums_rooms() {
        let f = farm();
        let layout = Layout::new(&f.groups, &f.rooms);
        let total = layout.occupancy(f.groups[0].id, |r| if r.is_separation { 1 } else { 10 });
        assert_eq!(total, 21);
    }

    #[test]
    fn parent_cycle_is_reported() {
        let mut a = RoomGroup::building("A", None).unwrap();
        let b = RoomGroup::sub_group("B", a.id).unwrap();
        a.parent = Some(b.id);
        let room = Room::new("R", 1, b.id, false).unwrap();
        let groups = vec![a, b];
        let rooms = vec![room];
        let layout = Layout::new(&groups, &rooms);

        assert!(matches!(
            layout.building_of(rooms[0].id),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(layout.subtree(groups[0].id).len(), 2);
    }

    #[test]
    fn constructors_validate_input() {
        assert!(RoomGroup::building("  ", None).is_err());
        assert!(Room::new("Room", -1, RoomGroupId::new(), false).is_err());
        assert!(Silo::new("Silo", 0.0, RoomGroupId::new(), FeedTypeId::new()).is_err());
    }
}
