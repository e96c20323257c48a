//! Empire - the top-level orchestrator
//!
//! Drives every operation through the five phases of a tick:
//! init -> role_call -> actions -> finalize -> invalidate_cache
//!
//! The empire owns the spawn registry shared by all operations, runs
//! construction-site housekeeping during `actions`, and exposes the
//! administrative commands. Hook failures never abort a phase; they are
//! collected and returned.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::core::config::EmpireConfig;
use crate::core::error::{EmpireError, Result};
use crate::core::types::{RoomName, Tick};
use crate::empire::memory::EmpireMemory;
use crate::host::distance::DistanceService;
use crate::host::instrument::{Instrumentation, TICK_START_LABEL};
use crate::host::world::WorldState;
use crate::host::Host;
use crate::operation::guard::{HookFailure, Phase};
use crate::operation::{Operation, OperationFactory};
use crate::spawn::{SpawnGroup, SpawnOrder, SpawnRegistry, SpawnRequest};

/// Outcome of one full tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: Tick,
    /// Spawn requests accepted during the tick
    pub spawn_orders: Vec<SpawnOrder>,
    /// Hooks that failed and were absorbed
    pub failures: Vec<HookFailure>,
    /// Operations whose caches were invalidated
    pub invalidated: Vec<String>,
}

impl TickReport {
    pub fn failures_in(&self, phase: Phase) -> impl Iterator<Item = &HookFailure> {
        self.failures.iter().filter(move |f| f.phase == phase)
    }
}

/// Where an administrative spawn room override points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnRoomTarget {
    Room(RoomName),
    /// The anchor room of another operation
    Operation(String),
}

pub struct Empire {
    config: EmpireConfig,
    spawns: SpawnRegistry,
    operations: Vec<Operation>,
    memory: EmpireMemory,
    rng: ChaCha8Rng,
    last_invalidated: Vec<String>,
}

impl Empire {
    pub fn new(config: EmpireConfig) -> Result<Self> {
        config.validate().map_err(EmpireError::InvalidConfig)?;
        Ok(Self {
            spawns: SpawnRegistry::new(config.min_spawn_level),
            operations: Vec::new(),
            memory: EmpireMemory::default(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            last_invalidated: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EmpireConfig {
        &self.config
    }

    pub fn spawns(&self) -> &SpawnRegistry {
        &self.spawns
    }

    pub fn memory(&self) -> &EmpireMemory {
        &self.memory
    }

    // === OPERATIONS ===

    /// Register an operation, replacing any operation with the same name
    ///
    /// Memory stored for that name (from a previous run) is handed over.
    pub fn add_operation(&mut self, mut operation: Operation) {
        if let Some(memory) = self.memory.operations.remove(operation.name()) {
            *operation.state_mut().memory_mut() = memory;
        }
        tracing::info!(operation = %operation.name(), "operation registered");
        match self.operations.iter().position(|op| op.name() == operation.name()) {
            Some(slot) => self.operations[slot] = operation,
            None => self.operations.push(operation),
        }
    }

    /// Unregister an operation; its memory is kept for a later re-add
    pub fn remove_operation(&mut self, name: &str) -> Option<Operation> {
        let slot = self.operations.iter().position(|op| op.name() == name)?;
        let operation = self.operations.remove(slot);
        self.memory
            .operations
            .insert(name.to_string(), operation.state().memory().clone());
        Some(operation)
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name() == name)
    }

    pub fn operation_mut(&mut self, name: &str) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| op.name() == name)
    }

    /// Operations in registration order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Build an operation for every typed flag not yet covered
    ///
    /// Returns the names of the operations added.
    pub fn bootstrap_from_flags(&mut self, factory: &OperationFactory, world: &dyn WorldState) -> Vec<String> {
        let mut added = Vec::new();
        for flag in world.flags() {
            if self.operation(&flag.name).is_some() {
                continue;
            }
            match OperationFactory::type_tag(&flag.name) {
                Some(tag) if factory.is_registered(tag) => {}
                _ => continue,
            }
            match factory.build(flag) {
                Ok(operation) => {
                    added.push(flag.name.clone());
                    self.add_operation(operation);
                }
                Err(e) => tracing::warn!(flag = %flag.name, error = %e, "operation not built"),
            }
        }
        added
    }

    // === PHASES ===

    /// Register newly eligible spawn groups, refresh all of them, then init operations
    pub fn init(&mut self, host: &mut Host<'_>) -> Vec<HookFailure> {
        host.instrument.start(TICK_START_LABEL);
        let added = self.spawns.discover(&*host.world);
        if !added.is_empty() {
            tracing::debug!(count = added.len(), "new spawn groups");
        }
        self.spawns.refresh(&*host.world);

        let mut failures = Vec::new();
        for op in self.operations.iter_mut() {
            let label = format!("init:{}", op.name());
            host.instrument.start(&label);
            failures.extend(op.init(&mut self.spawns, host, &self.config));
            host.instrument.end(&label);
        }
        host.instrument.end(TICK_START_LABEL);
        failures
    }

    pub fn role_call(&mut self, host: &mut Host<'_>) -> Vec<HookFailure> {
        host.instrument.start("role_call");
        let mut failures = Vec::new();
        for op in self.operations.iter_mut() {
            let label = format!("role_call:{}", op.name());
            host.instrument.start(&label);
            failures.extend(op.role_call(&mut self.spawns, host));
            host.instrument.end(&label);
        }
        host.instrument.end("role_call");
        failures
    }

    /// Mission actions, then periodic housekeeping and the overlay flush
    pub fn actions(&mut self, host: &mut Host<'_>) -> Vec<HookFailure> {
        let tick = host.world.time();
        host.instrument.start("actions");
        let mut failures = Vec::new();
        for op in self.operations.iter_mut() {
            let label = format!("actions:{}", op.name());
            host.instrument.start(&label);
            failures.extend(op.actions(&mut self.spawns, host));
            host.instrument.end(&label);
        }

        if tick % self.config.construction_check_interval == 0 {
            host.instrument.start("actions:construction");
            self.check_construction_sites(host);
            host.instrument.end("actions:construction");
        }
        host.overlay.flush(tick);
        host.instrument.end("actions");
        failures
    }

    pub fn finalize(&mut self, host: &mut Host<'_>) -> Vec<HookFailure> {
        host.instrument.start("finalize");
        let mut failures = Vec::new();
        for op in self.operations.iter_mut() {
            let label = format!("finalize:{}", op.name());
            host.instrument.start(&label);
            failures.extend(op.finalize(&mut self.spawns, host, &self.config));
            host.instrument.end(&label);
        }
        host.instrument.end("finalize");
        failures
    }

    /// Give each operation its scheduled chance to drop cached state
    pub fn invalidate_cache(&mut self, host: &mut Host<'_>) -> Vec<HookFailure> {
        let tick = host.world.time();
        host.instrument.start("invalidate_cache");
        self.last_invalidated.clear();
        let mut failures = Vec::new();
        for op in self.operations.iter_mut() {
            if !op.state().should_invalidate(&self.config.invalidation, &mut self.rng, tick) {
                continue;
            }
            tracing::debug!(tick, operation = %op.name(), "invalidating caches");
            let label = format!("invalidate_cache:{}", op.name());
            host.instrument.start(&label);
            failures.extend(op.invalidate_cache(&mut self.spawns, host, &self.config));
            host.instrument.end(&label);
            self.last_invalidated.push(op.name().to_string());
        }
        host.instrument.end("invalidate_cache");
        failures
    }

    /// Operations invalidated by the last `invalidate_cache` call
    pub fn last_invalidated(&self) -> &[String] {
        &self.last_invalidated
    }

    /// Drive all five phases in order
    pub fn run_tick(&mut self, host: &mut Host<'_>) -> TickReport {
        let tick = host.world.time();
        let mut failures = self.init(host);
        failures.extend(self.role_call(host));
        failures.extend(self.actions(host));
        failures.extend(self.finalize(host));
        failures.extend(self.invalidate_cache(host));

        let report = TickReport {
            tick,
            spawn_orders: self.spawns.drain_orders(),
            failures,
            invalidated: self.last_invalidated.clone(),
        };
        tracing::debug!(
            tick,
            orders = report.spawn_orders.len(),
            failures = report.failures.len(),
            "tick complete"
        );
        report
    }

    // === SPAWNING ===

    /// Spawn group for a room, registered on first eligible lookup
    pub fn get_spawn_group(&mut self, room: &RoomName, world: &dyn WorldState) -> Option<&SpawnGroup> {
        self.spawns.resolve(room, world).map(|group| &*group)
    }

    /// Whether the tick still has CPU headroom
    pub fn under_cpu_limit(&self, instrument: &dyn Instrumentation) -> bool {
        instrument.proportion_used() < self.config.cpu_limit
    }

    /// Spawn from the known group nearest to `room`
    pub fn spawn_from_closest(
        &mut self,
        room: &RoomName,
        request: SpawnRequest,
        distance: &dyn DistanceService,
        tick: Tick,
    ) -> Result<Uuid> {
        let closest = self
            .spawns
            .iter()
            .min_by_key(|group| distance.room_distance(room, group.room()))
            .map(|group| group.room().clone())
            .ok_or(EmpireError::NoSpawnGroups)?;
        self.spawns
            .get_mut(&closest)
            .ok_or(EmpireError::NoSpawnGroups)?
            .spawn(request, tick)
    }

    // === HOUSEKEEPING ===

    /// Reconcile construction sites left in rooms we cannot see
    ///
    /// A hidden room is flagged on the first pass; if it is still hidden with
    /// sites on the next pass, its sites are removed.
    fn check_construction_sites(&mut self, host: &mut Host<'_>) {
        let tick = host.world.time();
        let flagged: BTreeSet<RoomName> = self
            .memory
            .errant_construction_rooms
            .iter()
            .filter(|(_, flagged)| **flagged)
            .map(|(room, _)| room.clone())
            .collect();

        let mut hidden_rooms = BTreeSet::new();
        let mut cleared = BTreeSet::new();
        for site in host.world.construction_sites() {
            if site.room_visible {
                if self.memory.errant_construction_rooms.remove(&site.room).is_some() {
                    host.reports.report(
                        tick,
                        &format!("EMPIRE: construction anomaly in {} resolved", site.room),
                    );
                }
                continue;
            }

            hidden_rooms.insert(site.room.clone());
            if flagged.contains(&site.room) {
                host.world.remove_construction_site(&site.id);
                cleared.insert(site.room);
            } else {
                self.memory.errant_construction_rooms.insert(site.room, true);
            }
        }

        for room in cleared {
            self.memory.errant_construction_rooms.remove(&room);
            host.reports
                .report(tick, &format!("EMPIRE: removed construction sites in {}", room));
        }

        let gone: Vec<RoomName> = self
            .memory
            .errant_construction_rooms
            .keys()
            .filter(|room| !hidden_rooms.contains(*room))
            .cloned()
            .collect();
        for room in gone {
            self.memory.errant_construction_rooms.remove(&room);
            host.reports
                .report(tick, &format!("EMPIRE: construction anomaly in {} resolved", room));
        }
    }

    // === ADMINISTRATION ===

    /// Pin the spawn room of `operation`; the outcome is also reported
    pub fn set_spawn_room(
        &mut self,
        operation: &str,
        target: SpawnRoomTarget,
        portal_travel: bool,
        host: &mut Host<'_>,
    ) -> String {
        let tick = host.world.time();
        let room = match target {
            SpawnRoomTarget::Room(room) => Some(room),
            SpawnRoomTarget::Operation(name) => self.operation(&name).map(|op| op.state().anchor().room.clone()),
        };
        let message = match (room, self.operations.iter_mut().find(|op| op.name() == operation)) {
            (_, None) => format!("SPAWN: no operation named {}", operation),
            (None, Some(_)) => "SPAWN: target operation not found".to_string(),
            (Some(room), Some(op)) => {
                let max_waypoints = self.config.max_waypoints;
                op.set_spawn_room(
                    &room,
                    portal_travel,
                    &mut self.spawns,
                    &*host.world,
                    host.distance,
                    max_waypoints,
                )
            }
        };
        host.reports.report(tick, &message);
        message
    }

    pub fn set_max(&mut self, operation: &str, mission: &str, max: u32, host: &mut Host<'_>) -> String {
        let cap = self.config.max_mission_cap;
        let message = match self.operation_mut(operation) {
            Some(op) => op.set_max(mission, max, cap),
            None => format!("SPAWN: no operation named {}", operation),
        };
        host.reports.report(host.world.time(), &message);
        message
    }

    pub fn set_priority(&mut self, operation: &str, value: &str, host: &mut Host<'_>) -> String {
        let message = match self.operation_mut(operation) {
            Some(op) => op.set_priority(value),
            None => format!("PRIORITY: no operation named {}", operation),
        };
        host.reports.report(host.world.time(), &message);
        message
    }

    pub fn set_repair_target(&mut self, operation: &str, mission: &str, object_id: &str, host: &mut Host<'_>) -> String {
        let message = match self.operations.iter_mut().find(|op| op.name() == operation) {
            Some(op) => op.set_repair_target(mission, object_id, &*host.world),
            None => format!("REPAIR: no operation named {}", operation),
        };
        host.reports.report(host.world.time(), &message);
        message
    }

    // === PERSISTENCE ===

    /// Serialize empire memory, including every live operation's memory
    pub fn save_memory(&self) -> Result<String> {
        let mut memory = self.memory.clone();
        for op in &self.operations {
            memory
                .operations
                .insert(op.name().to_string(), op.state().memory().clone());
        }
        memory.to_json()
    }

    /// Restore memory saved by [`Empire::save_memory`]
    ///
    /// Live operations take their entry; the rest waits for `add_operation`.
    pub fn load_memory(&mut self, json: &str) -> Result<()> {
        let mut memory = EmpireMemory::from_json(json)?;
        for op in self.operations.iter_mut() {
            if let Some(stored) = memory.operations.remove(op.name()) {
                *op.state_mut().memory_mut() = stored;
            }
        }
        tracing::info!(
            pending = memory.operations.len(),
            errant_rooms = memory.errant_construction_rooms.len(),
            "empire memory loaded"
        );
        self.memory = memory;
        Ok(())
    }
}
