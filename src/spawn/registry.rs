//! Spawn registry - every known spawn group, keyed by room
//!
//! Groups are created lazily the first time a room passes the eligibility
//! test and are never removed afterwards: owned rooms with spawns are
//! durable, and keeping the group keeps its identity stable across ticks.

use ahash::AHashMap;

use crate::core::types::{RoomName, Tick};
use crate::host::world::WorldState;
use crate::spawn::group::{SpawnGroup, SpawnOrder};

#[derive(Debug, Default)]
pub struct SpawnRegistry {
    groups: AHashMap<RoomName, SpawnGroup>,
    /// Registration order, for deterministic iteration
    order: Vec<RoomName>,
    min_level: u8,
}

impl SpawnRegistry {
    pub fn new(min_level: u8) -> Self {
        Self {
            groups: AHashMap::new(),
            order: Vec::new(),
            min_level,
        }
    }

    /// Register every observable room that newly qualifies
    ///
    /// Returns the rooms registered by this call.
    pub fn discover(&mut self, world: &dyn WorldState) -> Vec<RoomName> {
        let tick = world.time();
        let mut added = Vec::new();
        for name in world.rooms() {
            if self.groups.contains_key(&name) {
                continue;
            }
            let Some(snapshot) = world.room(&name) else {
                continue;
            };
            if let Some(group) = SpawnGroup::from_room(snapshot, self.min_level, tick) {
                tracing::info!(room = %name, level = group.level(), "spawn group registered");
                self.insert(group);
                added.push(name);
            }
        }
        added
    }

    /// Re-derive every known group from the current world
    pub fn refresh(&mut self, world: &dyn WorldState) {
        let tick = world.time();
        for name in &self.order {
            if let Some(group) = self.groups.get_mut(name) {
                if group.is_stale(tick) {
                    group.refresh(world.room(name), tick);
                }
            }
        }
    }

    /// Look up a room's spawn group, registering it if it now qualifies
    ///
    /// Idempotent: the same group is returned for the same room every call.
    pub fn resolve(&mut self, room: &RoomName, world: &dyn WorldState) -> Option<&mut SpawnGroup> {
        let tick = world.time();
        if !self.groups.contains_key(room) {
            let snapshot = world.room(room)?;
            let group = SpawnGroup::from_room(snapshot, self.min_level, tick)?;
            tracing::info!(room = %room, level = group.level(), "spawn group registered");
            self.insert(group);
        }

        let group = self.groups.get_mut(room)?;
        if group.is_stale(tick) {
            group.refresh(world.room(room), tick);
        }
        Some(group)
    }

    pub fn get(&self, room: &RoomName) -> Option<&SpawnGroup> {
        self.groups.get(room)
    }

    pub fn get_mut(&mut self, room: &RoomName) -> Option<&mut SpawnGroup> {
        self.groups.get_mut(room)
    }

    pub fn contains(&self, room: &RoomName) -> bool {
        self.groups.contains_key(room)
    }

    /// Groups in registration order
    pub fn iter(&self) -> impl Iterator<Item = &SpawnGroup> {
        self.order.iter().filter_map(|name| self.groups.get(name))
    }

    pub fn rooms(&self) -> &[RoomName] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Collect every queued order, in registration order
    pub fn drain_orders(&mut self) -> Vec<SpawnOrder> {
        let mut orders = Vec::new();
        for name in &self.order {
            if let Some(group) = self.groups.get_mut(name) {
                orders.extend(group.drain_orders());
            }
        }
        orders
    }

    fn insert(&mut self, group: SpawnGroup) {
        self.order.push(group.room().clone());
        self.groups.insert(group.room().clone(), group);
    }
}
