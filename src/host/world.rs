//! World-state provider - the engine's view of rooms, flags and objects
//!
//! The control loop never talks to the game engine directly. Everything it
//! needs to know about the world goes through [`WorldState`], which the host
//! implements (see [`crate::host::sim::SimWorld`] for the in-memory one).

use serde::{Deserialize, Serialize};

use crate::core::types::{Position, RoomName, Tick};

/// Controller of a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    /// Whether we own the controller
    pub my: bool,
    pub level: u8,
}

/// A single spawn structure inside a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnFacility {
    pub id: String,
    pub my: bool,
    /// Currently producing a worker
    pub busy: bool,
}

/// A mineral deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mineral {
    pub pos: Position,
    pub kind: String,
}

/// Everything observable about a room this tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub name: RoomName,
    pub controller: Option<Controller>,
    pub spawns: Vec<SpawnFacility>,
    pub energy_available: u32,
    pub energy_capacity: u32,
    pub sources: Vec<Position>,
    pub minerals: Vec<Mineral>,
}

impl RoomSnapshot {
    pub fn new(name: impl Into<RoomName>) -> Self {
        Self {
            name: name.into(),
            controller: None,
            spawns: Vec::new(),
            energy_available: 0,
            energy_capacity: 0,
            sources: Vec::new(),
            minerals: Vec::new(),
        }
    }

    /// Level of our own controller, 0 when unowned or absent
    pub fn owned_level(&self) -> u8 {
        match &self.controller {
            Some(c) if c.my => c.level,
            _ => 0,
        }
    }

    pub fn my_spawns(&self) -> impl Iterator<Item = &SpawnFacility> {
        self.spawns.iter().filter(|s| s.my)
    }
}

/// A named marker placed on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub name: String,
    pub pos: Position,
}

/// A construction site as reported by the engine
///
/// Sites survive in rooms we lost vision of; those are the anomalies the
/// empire's housekeeping reconciles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionSite {
    pub id: String,
    pub room: RoomName,
    pub room_visible: bool,
}

/// Kind of a game object, used to validate administrative targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Road,
    Container,
    Rampart,
    Wall,
    Spawn,
    Extension,
    Tower,
    Storage,
    Creep,
    Source,
    Mineral,
    Controller,
}

impl ObjectKind {
    /// Structures that decay or take damage and can be repaired
    pub fn is_repairable(&self) -> bool {
        matches!(
            self,
            ObjectKind::Road
                | ObjectKind::Container
                | ObjectKind::Rampart
                | ObjectKind::Wall
                | ObjectKind::Spawn
                | ObjectKind::Extension
                | ObjectKind::Tower
                | ObjectKind::Storage
        )
    }
}

/// Read access to the world plus the few corrective actions the loop takes
pub trait WorldState {
    /// Current tick counter
    fn time(&self) -> Tick;

    /// Rooms currently observable, in a stable order
    fn rooms(&self) -> Vec<RoomName>;

    /// Snapshot of an observable room, `None` without vision
    fn room(&self, name: &RoomName) -> Option<&RoomSnapshot>;

    fn flag(&self, name: &str) -> Option<&Flag>;

    fn flags(&self) -> Vec<&Flag>;

    fn construction_sites(&self) -> Vec<ConstructionSite>;

    /// Remove a construction site, returns false if it did not exist
    fn remove_construction_site(&mut self, id: &str) -> bool;

    fn object_kind(&self, id: &str) -> Option<ObjectKind>;
}
