//! Missions - the schedulable behaviors an operation is made of
//!
//! A mission is driven through the same phases as its operation. Concrete
//! missions live in the domain layer; this module only defines the hook
//! contract, the per-call context and the ordered set an operation keeps.

use uuid::Uuid;

use crate::core::error::{EmpireError, Result};
use crate::core::types::Tick;
use crate::host::distance::DistanceService;
use crate::host::report::ReportSink;
use crate::host::world::WorldState;
use crate::operation::memory::MissionMemory;
use crate::operation::OperationState;
use crate::spawn::{SpawnGroup, SpawnRegistry, SpawnRequest};

/// Hook set driven once per phase per tick
///
/// Any `Err` (or panic) is caught at the owning operation's boundary and
/// never reaches sibling missions.
pub trait Mission {
    /// Unique within the owning operation
    fn name(&self) -> &str;

    fn init(&mut self, ctx: &mut MissionContext<'_>) -> Result<()>;

    fn role_call(&mut self, ctx: &mut MissionContext<'_>) -> Result<()>;

    fn actions(&mut self, ctx: &mut MissionContext<'_>) -> Result<()>;

    fn finalize(&mut self, ctx: &mut MissionContext<'_>) -> Result<()>;

    fn invalidate_cache(&mut self, ctx: &mut MissionContext<'_>) -> Result<()>;

    /// Drop anything derived from the distance to the spawn room
    fn invalidate_spawn_distance(&mut self) {}
}

/// What a mission sees during one hook call
///
/// The spawn group is looked up through the operation's current assignment
/// on every access, so a reassignment is visible immediately.
pub struct MissionContext<'a> {
    pub tick: Tick,
    pub operation: &'a OperationState,
    pub world: &'a dyn WorldState,
    pub distance: &'a dyn DistanceService,
    pub reports: &'a mut dyn ReportSink,
    spawns: &'a mut SpawnRegistry,
}

impl<'a> MissionContext<'a> {
    pub fn new(
        tick: Tick,
        operation: &'a OperationState,
        world: &'a dyn WorldState,
        distance: &'a dyn DistanceService,
        reports: &'a mut dyn ReportSink,
        spawns: &'a mut SpawnRegistry,
    ) -> Self {
        Self {
            tick,
            operation,
            world,
            distance,
            reports,
            spawns,
        }
    }

    /// The operation's currently assigned spawn group
    pub fn spawn_group(&self) -> Option<&SpawnGroup> {
        self.operation.spawn_room().and_then(|room| self.spawns.get(room))
    }

    pub fn spawn_group_mut(&mut self) -> Option<&mut SpawnGroup> {
        let room = self.operation.spawn_room()?;
        self.spawns.get_mut(room)
    }

    /// Queue a spawn on the operation's current spawn group
    pub fn spawn(&mut self, request: SpawnRequest) -> Result<Uuid> {
        let tick = self.tick;
        let operation = self.operation;
        match self.spawn_group_mut() {
            Some(group) => group.spawn(request, tick),
            None => Err(EmpireError::SpawnRejected {
                room: operation.anchor().room.clone(),
                reason: format!("operation {} has no spawn group", operation.name()),
            }),
        }
    }

    /// Persisted overrides for a mission of this operation
    pub fn memory(&self, mission: &str) -> Option<&MissionMemory> {
        self.operation.memory().missions.get(mission)
    }

    pub fn spawns(&self) -> &SpawnRegistry {
        &*self.spawns
    }
}

/// Missions of one operation, in registration order, names unique
#[derive(Default)]
pub struct MissionSet {
    missions: Vec<Box<dyn Mission>>,
}

impl MissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mission, replacing (in place) any mission with the same name
    pub fn add(&mut self, mission: Box<dyn Mission>) {
        match self.missions.iter().position(|m| m.name() == mission.name()) {
            Some(slot) => self.missions[slot] = mission,
            None => self.missions.push(mission),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.missions.iter().any(|m| m.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.missions.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Mission>> {
        self.missions.iter_mut()
    }
}
