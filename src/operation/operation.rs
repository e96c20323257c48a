//! Operation - a long-lived objective anchored on a flag
//!
//! An operation owns its missions and drives them through every phase of the
//! tick. It also owns the spawn assignment its missions read from, chosen
//! either by the operation's behavior (usually through
//! [`OperationState::get_remote_spawn_group`]) or by an administrative
//! override.
//!
//! Vision-dependent facts (sources, mineral) only exist while the anchor
//! room is observable; consumers get empty/`None` values otherwise.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::{EmpireConfig, InvalidationSchedule};
use crate::core::error::Result;
use crate::core::types::{OperationPriority, Position, RoomName, Tick};
use crate::host::distance::DistanceService;
use crate::host::report::ReportSink;
use crate::host::world::{Flag, Mineral, WorldState};
use crate::host::Host;
use crate::mission::{Mission, MissionContext, MissionSet};
use crate::operation::guard::{guard, HookFailure, Phase};
use crate::operation::memory::{OperationMemory, SpawnCandidate};
use crate::spawn::{SpawnGroup, SpawnRegistry};

/// Operation-level hooks supplied by the domain layer
pub trait OperationBehavior {
    /// Runs every tick before the missions' `init`; typically picks the spawn
    /// group and (re)adds missions
    fn init_operation(&mut self, ctx: &mut OperationContext<'_>) -> Result<()>;

    /// Runs after every mission finalized
    fn finalize_operation(&mut self, ctx: &mut OperationContext<'_>) -> Result<()>;

    fn invalidate_operation_cache(&mut self, ctx: &mut OperationContext<'_>) -> Result<()>;
}

/// What an operation behavior sees during one hook call
pub struct OperationContext<'a> {
    pub tick: Tick,
    pub state: &'a mut OperationState,
    pub missions: &'a mut MissionSet,
    pub spawns: &'a mut SpawnRegistry,
    pub world: &'a dyn WorldState,
    pub distance: &'a dyn DistanceService,
    pub reports: &'a mut dyn ReportSink,
    pub config: &'a EmpireConfig,
}

impl OperationContext<'_> {
    pub fn add_mission(&mut self, mission: Box<dyn Mission>) {
        self.missions.add(mission);
    }

    /// Run the remote allocation and make the result the current assignment
    ///
    /// An administrative override, when present and valid, wins.
    pub fn assign_remote_spawn_group(
        &mut self,
        distance_limit: u32,
        level_requirement: u8,
    ) -> Option<RoomName> {
        if let Some(room) = self.state.memory.spawn_room.clone() {
            if self.spawns.resolve(&room, self.world).is_some() {
                self.state.spawn_room = Some(room.clone());
                return Some(room);
            }
        }

        let room = self
            .state
            .get_remote_spawn_group(
                self.spawns,
                self.world,
                self.distance,
                self.config,
                distance_limit,
                level_requirement,
            )
            .map(|group| group.room().clone());
        self.state.spawn_room = room.clone();
        room
    }
}

/// Everything about an operation except its missions and behavior
#[derive(Debug, Clone)]
pub struct OperationState {
    name: String,
    op_type: String,
    flag: Flag,
    base_priority: OperationPriority,
    memory: OperationMemory,

    has_vision: bool,
    sources: Vec<Position>,
    mineral: Option<Mineral>,
    waypoints: Vec<Flag>,

    spawn_room: Option<RoomName>,
    ranking_count: u32,
}

impl OperationState {
    pub fn new(name: impl Into<String>, op_type: impl Into<String>, flag: Flag, priority: OperationPriority) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            flag,
            base_priority: priority,
            memory: OperationMemory::default(),
            has_vision: false,
            sources: Vec::new(),
            mineral: None,
            waypoints: Vec::new(),
            spawn_room: None,
            ranking_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    pub fn flag(&self) -> &Flag {
        &self.flag
    }

    pub fn anchor(&self) -> &Position {
        &self.flag.pos
    }

    /// Effective priority, honoring the administrative override
    pub fn priority(&self) -> OperationPriority {
        self.memory.priority.unwrap_or(self.base_priority)
    }

    pub fn memory(&self) -> &OperationMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut OperationMemory {
        &mut self.memory
    }

    pub fn has_vision(&self) -> bool {
        self.has_vision
    }

    /// Sources in the anchor room, nearest to the anchor first
    pub fn sources(&self) -> &[Position] {
        &self.sources
    }

    pub fn mineral(&self) -> Option<&Mineral> {
        self.mineral.as_ref()
    }

    pub fn waypoints(&self) -> &[Flag] {
        &self.waypoints
    }

    /// Room of the spawn group currently assigned
    pub fn spawn_room(&self) -> Option<&RoomName> {
        self.spawn_room.as_ref()
    }

    pub fn set_spawn_room(&mut self, room: Option<RoomName>) {
        self.spawn_room = room;
    }

    /// How many times the spawn candidate ranking ran
    pub fn ranking_count(&self) -> u32 {
        self.ranking_count
    }

    /// Re-read the anchor flag and the vision-dependent facts
    pub fn observe_anchor(&mut self, world: &dyn WorldState) {
        if let Some(flag) = world.flag(&self.flag.name) {
            self.flag = flag.clone();
        }

        match world.room(&self.flag.pos.room) {
            Some(room) => {
                self.has_vision = true;
                let anchor = &self.flag.pos;
                let mut sources = room.sources.clone();
                sources.sort_by_key(|s| s.range_to(anchor));
                self.sources = sources;
                // First observed deposit; rooms normally hold one
                self.mineral = room.minerals.first().cloned();
            }
            None => {
                self.has_vision = false;
                self.sources.clear();
                self.mineral = None;
            }
        }
    }

    /// Collect `{name}_waypoints_{i}` flags in index order, up to the first gap
    pub fn derive_waypoints(&mut self, world: &dyn WorldState, limit: usize) -> &[Flag] {
        self.waypoints = (0..limit)
            .map_while(|i| world.flag(&format!("{}_waypoints_{}", self.name, i)).cloned())
            .collect();
        &self.waypoints
    }

    /// Rank spawn groups for remote spawning and store the result
    ///
    /// Keeps groups at or above `level_requirement`, outside the anchor room,
    /// and within `distance_limit` plus the configured slack, nearest first.
    /// Returns whether any candidate was found.
    pub fn refresh_spawn_candidates(
        &mut self,
        spawns: &SpawnRegistry,
        distance: &dyn DistanceService,
        config: &EmpireConfig,
        tick: Tick,
        distance_limit: u32,
        level_requirement: u8,
    ) -> bool {
        self.ranking_count += 1;
        let anchor_room = &self.flag.pos.room;
        let limit = distance_limit.saturating_add(config.distance_slack);

        let mut ranked: Vec<SpawnCandidate> = spawns
            .iter()
            .filter(|g| g.level() >= level_requirement && g.room() != anchor_room)
            .map(|g| SpawnCandidate {
                room: g.room().clone(),
                distance: distance.room_distance(anchor_room, g.room()),
            })
            .filter(|c| c.distance <= limit)
            .collect();
        ranked.sort_by_key(|c| c.distance);

        if ranked.is_empty() {
            self.memory.spawn_rooms = None;
            self.memory.next_spawn_check = Some(tick + config.spawn_check_empty);
            tracing::info!(operation = %self.name, "no remote spawn group found");
            false
        } else {
            tracing::info!(
                operation = %self.name,
                nearest = %ranked[0].room,
                count = ranked.len(),
                "remote spawn groups ranked"
            );
            self.memory.spawn_rooms = Some(ranked);
            self.memory.next_spawn_check = Some(tick + config.spawn_check_found);
            true
        }
    }

    /// Pick a spawn group for remote spawning
    ///
    /// The ranking is cached until `next_spawn_check`. Among the cached rooms,
    /// the nearest fully idle group wins; otherwise the most available one.
    /// When nothing can be returned the recheck deadline is pulled forward to
    /// `tick + spawn_check_retry` (never pushed back).
    ///
    /// Administrative overrides are not consulted here; see
    /// [`OperationContext::assign_remote_spawn_group`].
    pub fn get_remote_spawn_group<'s>(
        &mut self,
        spawns: &'s mut SpawnRegistry,
        world: &dyn WorldState,
        distance: &dyn DistanceService,
        config: &EmpireConfig,
        distance_limit: u32,
        level_requirement: u8,
    ) -> Option<&'s SpawnGroup> {
        let tick = world.time();

        if self.memory.spawn_check_due(tick) {
            self.refresh_spawn_candidates(spawns, distance, config, tick, distance_limit, level_requirement);
        }

        let mut chosen: Option<RoomName> = None;
        if let Some(candidates) = &self.memory.spawn_rooms {
            let mut best_availability = 0.0;
            for candidate in candidates {
                let Some(group) = spawns.resolve(&candidate.room, world) else {
                    continue;
                };
                let availability = group.availability();
                if availability >= 1.0 {
                    chosen = Some(candidate.room.clone());
                    break;
                }
                if availability > best_availability {
                    best_availability = availability;
                    chosen = Some(candidate.room.clone());
                }
            }
        }

        match chosen {
            Some(room) => spawns.get(&room),
            None => {
                self.memory.pull_spawn_check(tick + config.spawn_check_retry);
                None
            }
        }
    }

    /// Whether this operation's caches are due for invalidation this tick
    pub fn should_invalidate(&self, schedule: &InvalidationSchedule, rng: &mut ChaCha8Rng, tick: Tick) -> bool {
        match schedule {
            InvalidationSchedule::Random { chance } => rng.gen_bool(chance.clamp(0.0, 1.0)),
            InvalidationSchedule::Staggered { period } => {
                let period = (*period).max(1);
                tick % period == stable_hash(&self.name) % period
            }
        }
    }
}

/// FNV-1a, stable across runs and platforms
fn stable_hash(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

/// An operation: state, missions and behavior
pub struct Operation {
    state: OperationState,
    missions: MissionSet,
    behavior: Box<dyn OperationBehavior>,
}

impl Operation {
    pub fn new(state: OperationState, behavior: Box<dyn OperationBehavior>) -> Self {
        Self {
            state,
            missions: MissionSet::new(),
            behavior,
        }
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut OperationState {
        &mut self.state
    }

    pub fn missions(&self) -> &MissionSet {
        &self.missions
    }

    pub fn add_mission(&mut self, mission: Box<dyn Mission>) {
        self.missions.add(mission);
    }

    // === PHASES ===

    /// Refresh anchor facts and the spawn assignment, then init behavior and missions
    pub fn init(&mut self, spawns: &mut SpawnRegistry, host: &mut Host<'_>, config: &EmpireConfig) -> Vec<HookFailure> {
        let tick = host.world.time();
        self.state.observe_anchor(&*host.world);
        self.state.derive_waypoints(&*host.world, config.max_waypoints);
        self.state.spawn_room = self.default_spawn_room(spawns, &*host.world);

        let mut failures = Vec::new();
        failures.extend(self.run_behavior(Phase::Init, spawns, host, config, tick));
        failures.extend(self.run_missions(Phase::Init, spawns, host, tick));
        failures
    }

    pub fn role_call(&mut self, spawns: &mut SpawnRegistry, host: &mut Host<'_>) -> Vec<HookFailure> {
        let tick = host.world.time();
        self.run_missions(Phase::RoleCall, spawns, host, tick)
    }

    pub fn actions(&mut self, spawns: &mut SpawnRegistry, host: &mut Host<'_>) -> Vec<HookFailure> {
        let tick = host.world.time();
        self.run_missions(Phase::Actions, spawns, host, tick)
    }

    /// Finalize missions, then the operation itself
    pub fn finalize(&mut self, spawns: &mut SpawnRegistry, host: &mut Host<'_>, config: &EmpireConfig) -> Vec<HookFailure> {
        let tick = host.world.time();
        let mut failures = self.run_missions(Phase::Finalize, spawns, host, tick);
        failures.extend(self.run_behavior(Phase::Finalize, spawns, host, config, tick));
        failures
    }

    /// Invalidate mission caches, then the operation's own
    pub fn invalidate_cache(&mut self, spawns: &mut SpawnRegistry, host: &mut Host<'_>, config: &EmpireConfig) -> Vec<HookFailure> {
        let tick = host.world.time();
        let mut failures = self.run_missions(Phase::InvalidateCache, spawns, host, tick);
        failures.extend(self.run_behavior(Phase::InvalidateCache, spawns, host, config, tick));
        failures
    }

    fn default_spawn_room(&self, spawns: &mut SpawnRegistry, world: &dyn WorldState) -> Option<RoomName> {
        if let Some(room) = &self.state.memory.spawn_room {
            if spawns.resolve(room, world).is_some() {
                return Some(room.clone());
            }
        }
        let home = &self.state.flag.pos.room;
        spawns.resolve(home, world).map(|g| g.room().clone())
    }

    fn run_behavior(
        &mut self,
        phase: Phase,
        spawns: &mut SpawnRegistry,
        host: &mut Host<'_>,
        config: &EmpireConfig,
        tick: Tick,
    ) -> Option<HookFailure> {
        let name = self.state.name.clone();
        let behavior = &mut self.behavior;
        let mut ctx = OperationContext {
            tick,
            state: &mut self.state,
            missions: &mut self.missions,
            spawns,
            world: &*host.world,
            distance: host.distance,
            reports: &mut *host.reports,
            config,
        };
        guard(tick, phase, &name, None, || match phase {
            Phase::Init => behavior.init_operation(&mut ctx),
            Phase::Finalize => behavior.finalize_operation(&mut ctx),
            Phase::InvalidateCache => behavior.invalidate_operation_cache(&mut ctx),
            Phase::RoleCall | Phase::Actions => Ok(()),
        })
    }

    fn run_missions(
        &mut self,
        phase: Phase,
        spawns: &mut SpawnRegistry,
        host: &mut Host<'_>,
        tick: Tick,
    ) -> Vec<HookFailure> {
        let mut failures = Vec::new();
        let state = &self.state;

        for mission in self.missions.iter_mut() {
            let mission_name = mission.name().to_string();
            let label = format!("{}:{}:{}", phase, state.name, mission_name);
            host.instrument.start(&label);

            let mut ctx = MissionContext::new(
                tick,
                state,
                &*host.world,
                host.distance,
                &mut *host.reports,
                &mut *spawns,
            );
            let failure = guard(tick, phase, &state.name, Some(mission_name.as_str()), || match phase {
                Phase::Init => mission.init(&mut ctx),
                Phase::RoleCall => mission.role_call(&mut ctx),
                Phase::Actions => mission.actions(&mut ctx),
                Phase::Finalize => mission.finalize(&mut ctx),
                Phase::InvalidateCache => mission.invalidate_cache(&mut ctx),
            });

            host.instrument.end(&label);
            failures.extend(failure);
        }
        failures
    }

    // === ADMINISTRATION ===

    /// Pin the spawn room; returns a human-readable outcome
    ///
    /// Portal travel needs waypoint flags present in `world` right now.
    pub fn set_spawn_room(
        &mut self,
        room: &RoomName,
        portal_travel: bool,
        spawns: &mut SpawnRegistry,
        world: &dyn WorldState,
        distance: &dyn DistanceService,
        max_waypoints: usize,
    ) -> String {
        if spawns.resolve(room, world).is_none() {
            return format!("SPAWN: {} doesn't appear to host a valid spawn group", room);
        }
        if portal_travel && self.state.derive_waypoints(world, max_waypoints).is_empty() {
            return format!(
                "SPAWN: {} needs at least one waypoint ({}_waypoints_0) to use portal travel",
                self.state.name, self.state.name
            );
        }

        self.state.memory.spawn_room = Some(room.clone());
        self.state.memory.portal_travel = portal_travel;
        self.state.spawn_room = Some(room.clone());
        for mission in self.missions.iter_mut() {
            mission.invalidate_spawn_distance();
        }

        format!(
            "SPAWN: spawn room for {} set to {} (map range: {})",
            self.state.name,
            room,
            distance.room_distance(&self.state.flag.pos.room, room)
        )
    }

    /// Override how many workers a mission keeps alive
    pub fn set_max(&mut self, mission: &str, max: u32, cap: u32) -> String {
        if !self.missions.contains(mission) {
            return format!("SPAWN: no {} mission in {}", mission, self.state.name);
        }
        if max > cap {
            return format!("SPAWN: max for {} must be between 0 and {}, got {}", mission, cap, max);
        }

        let entry = self.state.memory.missions.entry(mission.to_string()).or_default();
        let old = entry.max.map_or_else(|| "default".to_string(), |m| m.to_string());
        entry.max = Some(max);
        format!("SPAWN: {} max spawn value changed from {} to {}", mission, old, max)
    }

    pub fn set_priority(&mut self, value: &str) -> String {
        match value.parse::<OperationPriority>() {
            Ok(priority) => {
                let old = self.state.priority();
                self.state.memory.priority = Some(priority);
                format!(
                    "PRIORITY: {} changed from {:?} to {:?}",
                    self.state.name, old, priority
                )
            }
            Err(e) => format!("PRIORITY: {} for {}", e, self.state.name),
        }
    }

    /// Point a mission at a structure to repair
    pub fn set_repair_target(&mut self, mission: &str, object_id: &str, world: &dyn WorldState) -> String {
        let object_id = object_id.trim();
        if object_id.is_empty() {
            return "REPAIR: no target id given".to_string();
        }
        if !self.missions.contains(mission) {
            return format!("REPAIR: no {} mission in {}", mission, self.state.name);
        }
        let Some(kind) = world.object_kind(object_id) else {
            return format!("REPAIR: no object with id {}", object_id);
        };
        if !kind.is_repairable() {
            return format!("REPAIR: {} is a {:?}, not a repairable structure", object_id, kind);
        }

        self.state
            .memory
            .missions
            .entry(mission.to_string())
            .or_default()
            .repair_target = Some(object_id.to_string());
        format!("REPAIR: {} in {} will repair {}", mission, self.state.name, object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::distance::LinearDistance;
    use crate::host::report::EventLog;
    use crate::host::sim::SimWorld;
    use crate::host::world::ObjectKind;

    struct Idle;

    impl OperationBehavior for Idle {
        fn init_operation(&mut self, _ctx: &mut OperationContext<'_>) -> Result<()> {
            Ok(())
        }
        fn finalize_operation(&mut self, _ctx: &mut OperationContext<'_>) -> Result<()> {
            Ok(())
        }
        fn invalidate_operation_cache(&mut self, _ctx: &mut OperationContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    struct Worker;

    impl Mission for Worker {
        fn name(&self) -> &str {
            "worker"
        }
        fn init(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
            Ok(())
        }
        fn role_call(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
            Ok(())
        }
        fn actions(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
            Ok(())
        }
        fn finalize(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
            Ok(())
        }
        fn invalidate_cache(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn anchored(room: &str) -> OperationState {
        let flag = Flag {
            name: "mining_1".to_string(),
            pos: Position::new(room, 25, 25),
        };
        OperationState::new("mining_1", "mining", flag, OperationPriority::Medium)
    }

    /// Owned room with `spawns` spawns of which `busy` are producing
    fn add_group(world: &mut SimWorld, room: &str, level: u8, spawns: usize, busy: usize) {
        world.add_owned_room(room, level, spawns);
        world.set_busy_spawns(room, busy);
    }

    #[test]
    fn test_nearest_saturated_group_wins() {
        let mut world = SimWorld::new();
        add_group(&mut world, "E12N10", 4, 5, 3); // d=2, 0.4
        add_group(&mut world, "E15N10", 4, 2, 0); // d=5, 1.0
        add_group(&mut world, "E19N10", 4, 10, 1); // d=9, 0.9
        let mut spawns = SpawnRegistry::new(1);
        spawns.discover(&world);
        let config = EmpireConfig::default();
        let mut state = anchored("E10N10");

        let group = state
            .get_remote_spawn_group(&mut spawns, &world, &LinearDistance::new(), &config, 10, 1)
            .map(|g| g.room().clone());

        assert_eq!(group, Some(RoomName::from("E15N10")));
        assert_eq!(state.memory().next_spawn_check, Some(config.spawn_check_found));
    }

    #[test]
    fn test_most_available_when_none_saturated() {
        let mut world = SimWorld::new();
        add_group(&mut world, "E11N10", 4, 5, 3); // 0.4
        add_group(&mut world, "E13N10", 4, 10, 1); // 0.9
        add_group(&mut world, "E14N10", 4, 2, 2); // 0.0
        let mut spawns = SpawnRegistry::new(1);
        spawns.discover(&world);
        let mut state = anchored("E10N10");

        let group = state
            .get_remote_spawn_group(&mut spawns, &world, &LinearDistance::new(), &EmpireConfig::default(), 10, 1)
            .map(|g| g.room().clone());

        assert_eq!(group, Some(RoomName::from("E13N10")));
    }

    #[test]
    fn test_no_candidates_backs_off_then_retries() {
        let mut world = SimWorld::new();
        let mut spawns = SpawnRegistry::new(1);
        let distance = LinearDistance::new();
        let config = EmpireConfig::default();
        let mut state = anchored("E10N10");

        assert!(state.get_remote_spawn_group(&mut spawns, &world, &distance, &config, 4, 1).is_none());
        assert_eq!(state.ranking_count(), 1);
        assert_eq!(state.memory().next_spawn_check, Some(config.spawn_check_retry));

        world.time = 10;
        assert!(state.get_remote_spawn_group(&mut spawns, &world, &distance, &config, 4, 1).is_none());
        assert_eq!(state.ranking_count(), 1, "no recompute 10 ticks later");

        world.time = 150;
        state.get_remote_spawn_group(&mut spawns, &world, &distance, &config, 4, 1);
        assert_eq!(state.ranking_count(), 2, "recompute allowed 150 ticks later");
    }

    #[test]
    fn test_ranking_cached_within_tick() {
        let mut world = SimWorld::new();
        add_group(&mut world, "E12N10", 4, 1, 0);
        let mut spawns = SpawnRegistry::new(1);
        spawns.discover(&world);
        let distance = LinearDistance::new();
        let config = EmpireConfig::default();
        let mut state = anchored("E10N10");

        let first = state
            .get_remote_spawn_group(&mut spawns, &world, &distance, &config, 4, 1)
            .map(|g| g.room().clone());
        let second = state
            .get_remote_spawn_group(&mut spawns, &world, &distance, &config, 4, 1)
            .map(|g| g.room().clone());

        assert_eq!(first, second);
        assert_eq!(state.ranking_count(), 1);
    }

    #[test]
    fn test_backoff_monotonicity() {
        let distance = LinearDistance::new();
        let config = EmpireConfig::default();
        let tick = 5_000;

        let mut state = anchored("E10N10");
        assert!(!state.refresh_spawn_candidates(&SpawnRegistry::new(1), &distance, &config, tick, 4, 1));
        let empty_next = state.memory().next_spawn_check.unwrap_or_default();

        let mut idle_world = SimWorld::new();
        idle_world.time = tick;
        add_group(&mut idle_world, "E11N10", 4, 1, 0);
        let mut idle = SpawnRegistry::new(1);
        idle.discover(&idle_world);
        let mut state = anchored("E10N10");
        assert!(state.get_remote_spawn_group(&mut idle, &idle_world, &distance, &config, 4, 1).is_some());
        let found_next = state.memory().next_spawn_check.unwrap_or_default();

        // Ranked but every group busy: the walk returns nothing
        let mut busy_world = SimWorld::new();
        busy_world.time = tick;
        add_group(&mut busy_world, "E11N10", 4, 1, 1);
        add_group(&mut busy_world, "E12N10", 4, 2, 2);
        let mut busy = SpawnRegistry::new(1);
        busy.discover(&busy_world);
        let mut state = anchored("E10N10");
        assert!(state.get_remote_spawn_group(&mut busy, &busy_world, &distance, &config, 4, 1).is_none());
        assert_eq!(state.memory().spawn_rooms.as_ref().map(Vec::len), Some(2));
        let retry_next = state.memory().next_spawn_check.unwrap_or_default();

        assert!(found_next > empty_next);
        assert!(empty_next > retry_next);
        assert_eq!(found_next - tick, 10_000);
        assert_eq!(empty_next - tick, 1_000);
        assert_eq!(retry_next - tick, 100);
    }

    #[test]
    fn test_candidates_respect_slack_level_and_anchor() {
        let mut world = SimWorld::new();
        add_group(&mut world, "E10N10", 8, 1, 0); // anchor room itself
        add_group(&mut world, "E15N10", 4, 1, 0); // d=5, limit+slack
        add_group(&mut world, "E16N10", 4, 1, 0); // d=6, too far
        add_group(&mut world, "E12N10", 1, 1, 0); // too low
        let mut spawns = SpawnRegistry::new(1);
        spawns.discover(&world);
        let mut state = anchored("E10N10");

        state.refresh_spawn_candidates(&spawns, &LinearDistance::new(), &EmpireConfig::default(), 0, 4, 3);

        let rooms: Vec<_> = state
            .memory()
            .spawn_rooms
            .iter()
            .flatten()
            .map(|c| c.room.as_str())
            .collect();
        assert_eq!(rooms, vec!["E15N10"]);
    }

    /// Anchor E10N10 with an idle level 4 group next door and an override
    /// pointing at a distant, busy, level 1 group
    fn overridden() -> (SimWorld, SpawnRegistry, OperationState) {
        let mut world = SimWorld::new();
        add_group(&mut world, "E11N10", 4, 1, 0);
        add_group(&mut world, "E30N30", 1, 1, 1);
        let mut spawns = SpawnRegistry::new(1);
        spawns.discover(&world);
        let mut state = anchored("E10N10");
        state.memory_mut().spawn_room = Some("E30N30".into());
        (world, spawns, state)
    }

    #[test]
    fn test_allocation_ignores_override() {
        let (world, mut spawns, mut state) = overridden();
        let distance = LinearDistance::new();
        let config = EmpireConfig::default();

        let group = state
            .get_remote_spawn_group(&mut spawns, &world, &distance, &config, 4, 3)
            .map(|g| (g.room().clone(), g.level(), g.availability()));

        let (room, level, availability) = group.expect("in-range group exists");
        assert_eq!(room, RoomName::from("E11N10"));
        assert!(distance.room_distance(&"E10N10".into(), &room) <= 4 + config.distance_slack);
        assert!(level >= 3);
        assert!(availability > 0.0);
    }

    #[test]
    fn test_override_wins_at_assignment() {
        let (world, mut spawns, mut state) = overridden();
        let mut missions = MissionSet::new();
        let mut log = EventLog::new();
        let distance = LinearDistance::new();
        let config = EmpireConfig::default();
        let mut ctx = OperationContext {
            tick: 0,
            state: &mut state,
            missions: &mut missions,
            spawns: &mut spawns,
            world: &world,
            distance: &distance,
            reports: &mut log,
            config: &config,
        };

        assert_eq!(ctx.assign_remote_spawn_group(4, 3), Some(RoomName::from("E30N30")));
        assert_eq!(state.spawn_room(), Some(&RoomName::from("E30N30")));
        assert_eq!(state.ranking_count(), 0, "override skips ranking");
    }

    #[test]
    fn test_invalid_override_falls_back_to_allocation() {
        let (world, mut spawns, mut state) = overridden();
        state.memory_mut().spawn_room = Some("W9N9".into());
        let mut missions = MissionSet::new();
        let mut log = EventLog::new();
        let distance = LinearDistance::new();
        let config = EmpireConfig::default();
        let mut ctx = OperationContext {
            tick: 0,
            state: &mut state,
            missions: &mut missions,
            spawns: &mut spawns,
            world: &world,
            distance: &distance,
            reports: &mut log,
            config: &config,
        };

        assert_eq!(ctx.assign_remote_spawn_group(4, 3), Some(RoomName::from("E11N10")));
        assert_eq!(state.ranking_count(), 1);
    }

    #[test]
    fn test_observe_anchor_without_vision() {
        let mut world = SimWorld::new();
        world.add_owned_room("E10N10", 3, 1);
        world.add_source(Position::new("E10N10", 40, 40));
        world.add_source(Position::new("E10N10", 20, 26));
        world.add_mineral(Position::new("E10N10", 5, 5), "H");
        let mut state = anchored("E10N10");

        state.observe_anchor(&world);
        assert!(state.has_vision());
        assert_eq!(state.sources()[0], Position::new("E10N10", 20, 26), "nearest source first");
        assert_eq!(state.mineral().map(|m| m.kind.as_str()), Some("H"));

        world.set_visible("E10N10", false);
        state.observe_anchor(&world);
        assert!(!state.has_vision());
        assert!(state.sources().is_empty());
        assert!(state.mineral().is_none());
    }

    #[test]
    fn test_waypoints_stop_at_first_gap() {
        let mut world = SimWorld::new();
        for i in [0, 1, 3] {
            world.add_flag(&format!("mining_1_waypoints_{}", i), Position::new("E5N5", 10, 10));
        }
        let mut state = anchored("E10N10");

        assert_eq!(state.derive_waypoints(&world, 100).len(), 2);
        assert_eq!(state.derive_waypoints(&world, 1).len(), 1);
    }

    #[test]
    fn test_staggered_invalidation_fires_once_per_period() {
        use rand::SeedableRng;
        let state = anchored("E10N10");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let schedule = InvalidationSchedule::Staggered { period: 10 };

        let fired = (0..30)
            .filter(|tick| state.should_invalidate(&schedule, &mut rng, *tick))
            .count();
        assert_eq!(fired, 3);
    }

    #[test]
    fn test_set_spawn_room_validation() {
        let mut world = SimWorld::new();
        add_group(&mut world, "E13N10", 4, 1, 0);
        let mut spawns = SpawnRegistry::new(1);
        let distance = LinearDistance::new();
        let mut op = Operation::new(anchored("E10N10"), Box::new(Idle));

        let msg = op.set_spawn_room(&"W1N1".into(), false, &mut spawns, &world, &distance, 100);
        assert!(msg.contains("doesn't appear to host"), "got: {}", msg);

        let msg = op.set_spawn_room(&"E13N10".into(), true, &mut spawns, &world, &distance, 100);
        assert!(msg.contains("waypoint"), "got: {}", msg);
        assert!(op.state().memory().spawn_room.is_none());

        let msg = op.set_spawn_room(&"E13N10".into(), false, &mut spawns, &world, &distance, 100);
        assert!(msg.contains("map range: 3"), "got: {}", msg);
        assert_eq!(op.state().spawn_room(), Some(&RoomName::from("E13N10")));

        // Waypoint placed after construction, no init in between
        world.add_flag("mining_1_waypoints_0", Position::new("E12N10", 10, 10));
        let msg = op.set_spawn_room(&"E13N10".into(), true, &mut spawns, &world, &distance, 100);
        assert!(msg.contains("set to E13N10"), "got: {}", msg);
        assert!(op.state().memory().portal_travel);
    }

    #[test]
    fn test_admin_overrides() {
        let mut world = SimWorld::new();
        world.add_object("road_1", ObjectKind::Road);
        world.add_object("src_1", ObjectKind::Source);
        let mut op = Operation::new(anchored("E10N10"), Box::new(Idle));
        op.add_mission(Box::new(Worker));

        assert!(op.set_max("hauler", 3, 50).contains("no hauler"));
        assert!(op.set_max("worker", 51, 50).contains("between 0 and 50"));
        assert!(op.set_max("worker", 4, 50).contains("from default to 4"));
        assert_eq!(op.state().memory().missions["worker"].max, Some(4));

        assert!(op.set_priority("urgent-ish").starts_with("PRIORITY:"));
        op.set_priority("high");
        assert_eq!(op.state().priority(), OperationPriority::High);

        assert!(op.set_repair_target("worker", "", &world).contains("no target"));
        assert!(op.set_repair_target("worker", "nope", &world).contains("no object"));
        assert!(op.set_repair_target("worker", "src_1", &world).contains("not a repairable"));
        op.set_repair_target("worker", "road_1", &world);
        assert_eq!(
            op.state().memory().missions["worker"].repair_target.as_deref(),
            Some("road_1")
        );
    }
}
