//! In-memory world used by the driver binary and the tests

use ahash::AHashMap;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{Position, RoomName, Tick};
use crate::host::world::{
    ConstructionSite, Controller, Flag, Mineral, ObjectKind, RoomSnapshot, SpawnFacility,
    WorldState,
};

/// A hand-built world
///
/// Rooms stay registered when vision is lost; they just stop being reported.
#[derive(Debug, Default)]
pub struct SimWorld {
    pub time: Tick,
    rooms: BTreeMap<RoomName, RoomSnapshot>,
    hidden: BTreeSet<RoomName>,
    flags: BTreeMap<String, Flag>,
    sites: Vec<(String, RoomName)>,
    objects: AHashMap<String, ObjectKind>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&mut self, snapshot: RoomSnapshot) -> &mut RoomSnapshot {
        match self.rooms.entry(snapshot.name.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(snapshot);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(snapshot),
        }
    }

    /// Add a room we own at `level` with `spawn_count` idle spawns
    pub fn add_owned_room(&mut self, name: &str, level: u8, spawn_count: usize) -> &mut RoomSnapshot {
        let mut room = RoomSnapshot::new(name);
        room.controller = Some(Controller { my: true, level });
        room.energy_capacity = 300 + 250 * level.saturating_sub(1) as u32;
        room.energy_available = room.energy_capacity;
        for i in 0..spawn_count {
            let id = format!("spawn_{}_{}", name, i);
            self.objects.insert(id.clone(), ObjectKind::Spawn);
            room.spawns.push(SpawnFacility {
                id,
                my: true,
                busy: false,
            });
        }
        self.add_room(room)
    }

    pub fn room_mut(&mut self, name: &str) -> Option<&mut RoomSnapshot> {
        self.rooms.get_mut(&RoomName::from(name))
    }

    pub fn set_visible(&mut self, name: &str, visible: bool) {
        let name = RoomName::from(name);
        if visible {
            self.hidden.remove(&name);
        } else {
            self.hidden.insert(name);
        }
    }

    /// Mark the first `busy` spawns of a room as producing
    pub fn set_busy_spawns(&mut self, name: &str, busy: usize) {
        if let Some(room) = self.room_mut(name) {
            for (i, spawn) in room.spawns.iter_mut().enumerate() {
                spawn.busy = i < busy;
            }
        }
    }

    pub fn add_source(&mut self, pos: Position) {
        let id = format!("source_{}_{}_{}", pos.room, pos.x, pos.y);
        self.objects.insert(id, ObjectKind::Source);
        if let Some(room) = self.rooms.get_mut(&pos.room) {
            room.sources.push(pos);
        }
    }

    pub fn add_mineral(&mut self, pos: Position, kind: &str) {
        if let Some(room) = self.rooms.get_mut(&pos.room) {
            room.minerals.push(Mineral {
                pos,
                kind: kind.to_string(),
            });
        }
    }

    pub fn add_flag(&mut self, name: &str, pos: Position) {
        self.flags.insert(
            name.to_string(),
            Flag {
                name: name.to_string(),
                pos,
            },
        );
    }

    pub fn remove_flag(&mut self, name: &str) {
        self.flags.remove(name);
    }

    pub fn add_construction_site(&mut self, id: &str, room: &str) {
        self.sites.push((id.to_string(), RoomName::from(room)));
    }

    pub fn add_object(&mut self, id: &str, kind: ObjectKind) {
        self.objects.insert(id.to_string(), kind);
    }

    pub fn advance(&mut self) {
        self.time += 1;
    }

    fn is_visible(&self, name: &RoomName) -> bool {
        self.rooms.contains_key(name) && !self.hidden.contains(name)
    }
}

impl WorldState for SimWorld {
    fn time(&self) -> Tick {
        self.time
    }

    fn rooms(&self) -> Vec<RoomName> {
        self.rooms
            .keys()
            .filter(|name| !self.hidden.contains(*name))
            .cloned()
            .collect()
    }

    fn room(&self, name: &RoomName) -> Option<&RoomSnapshot> {
        if self.hidden.contains(name) {
            return None;
        }
        self.rooms.get(name)
    }

    fn flag(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    fn flags(&self) -> Vec<&Flag> {
        self.flags.values().collect()
    }

    fn construction_sites(&self) -> Vec<ConstructionSite> {
        self.sites
            .iter()
            .map(|(id, room)| ConstructionSite {
                id: id.clone(),
                room: room.clone(),
                room_visible: self.is_visible(room),
            })
            .collect()
    }

    fn remove_construction_site(&mut self, id: &str) -> bool {
        let before = self.sites.len();
        self.sites.retain(|(site_id, _)| site_id != id);
        self.sites.len() != before
    }

    fn object_kind(&self, id: &str) -> Option<ObjectKind> {
        self.objects.get(id).copied()
    }
}
