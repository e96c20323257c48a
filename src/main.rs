//! Empire Ops - demo driver
//!
//! Builds a small in-memory world, bootstraps operations from its flags and
//! runs the control loop for a number of ticks. Spawns that receive an order
//! stay busy for a few ticks so spawn availability actually moves.

use ahash::AHashMap;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use empire_ops::core::error::{EmpireError, Result};
use empire_ops::core::types::{OperationPriority, Position, Tick};
use empire_ops::core::EmpireConfig;
use empire_ops::empire::{Empire, SpawnRoomTarget};
use empire_ops::host::{
    EventLog, Host, LinearDistance, NullOverlay, RoomSnapshot, SimWorld, TickProfiler, WorldState,
};
use empire_ops::mission::{Mission, MissionContext};
use empire_ops::operation::{OperationBehavior, OperationContext, OperationFactory};
use empire_ops::spawn::SpawnRequest;

/// Ticks a spawn stays busy after accepting an order
const SPAWN_TIME: Tick = 9;

#[derive(Parser, Debug)]
#[command(name = "empire-ops")]
#[command(about = "Run the empire control loop on a demo world")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 2_000)]
    ticks: u64,

    /// Random seed for the cache invalidation roll
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file (missing keys use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Empire memory to restore before the first tick
    #[arg(long)]
    memory_in: Option<PathBuf>,

    /// Where to write empire memory after the last tick
    #[arg(long)]
    memory_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("empire_ops=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EmpireConfig::load(path)?,
        None => EmpireConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut world = demo_world();
    let distance = LinearDistance::new();
    let mut profiler = TickProfiler::new(config.tick_budget_ms);
    let mut log = EventLog::new();
    let mut overlay = NullOverlay;

    let mut factory = OperationFactory::new();
    factory.register("mining", OperationPriority::High, |_| Box::new(MiningOperation));
    factory.register("scout", OperationPriority::Low, |_| Box::new(ScoutOperation));

    let mut empire = Empire::new(config)?;
    if let Some(path) = &args.memory_in {
        empire.load_memory(&std::fs::read_to_string(path)?)?;
    }
    let added = empire.bootstrap_from_flags(&factory, &world);
    tracing::info!(operations = ?added, "bootstrapped");

    let mut busy_until: AHashMap<String, Tick> = AHashMap::new();
    let mut total_orders = 0;
    let mut total_failures = 0;

    for _ in 0..args.ticks {
        apply_busy(&mut world, &busy_until);
        profiler.begin_tick();

        let mut host = Host {
            world: &mut world,
            distance: &distance,
            instrument: &mut profiler,
            reports: &mut log,
            overlay: &mut overlay,
        };
        if host.world.time() == 10 {
            empire.set_max("mining_1", "miner_0", 2, &mut host);
            empire.set_spawn_room("scout_1", SpawnRoomTarget::Room("E3N1".into()), false, &mut host);
        }
        let report = empire.run_tick(&mut host);
        if !empire.under_cpu_limit(&profiler) {
            tracing::warn!(tick = report.tick, "tick over CPU limit");
        }
        profiler.end_tick();

        for order in &report.spawn_orders {
            busy_until.insert(order.spawn_id.clone(), report.tick + SPAWN_TIME);
        }
        total_orders += report.spawn_orders.len();
        total_failures += report.failures.len();
        world.advance();
    }

    println!("\n=== EMPIRE OPS ===");
    println!("Ticks:         {}", args.ticks);
    println!("Spawn groups:  {}", empire.spawns().len());
    println!("Spawn orders:  {}", total_orders);
    println!("Hook failures: {}", total_failures);
    println!("Avg tick:      {:.3}ms", profiler.avg_tick_time_ms());
    println!("\n--- Operations ---");
    for op in empire.operations() {
        let state = op.state();
        println!(
            "{:<12} {:?} spawn room: {} missions: {:?}",
            state.name(),
            state.priority(),
            state.spawn_room().map_or("-".to_string(), |r| r.to_string()),
            op.missions().names()
        );
    }
    println!("\n--- Reports ---");
    for event in &log.events {
        println!("[{}] {}", event.tick, event.message);
    }

    if let Some(path) = &args.memory_out {
        std::fs::write(path, empire.save_memory()?)?;
        println!("\nMemory written to {}", path.display());
    }
    Ok(())
}

fn demo_world() -> SimWorld {
    let mut world = SimWorld::new();
    world.add_owned_room("E1N1", 4, 2);
    world.add_owned_room("E3N1", 3, 1);

    world.add_room(RoomSnapshot::new("E2N2"));
    world.add_source(Position::new("E2N2", 12, 30));
    world.add_source(Position::new("E2N2", 40, 8));
    world.add_mineral(Position::new("E2N2", 33, 33), "O");
    world.add_flag("mining_1", Position::new("E2N2", 25, 25));
    world.add_flag("mining_1_waypoints_0", Position::new("E2N1", 25, 25));

    // Lost room with a stray site, reconciled by housekeeping
    world.add_room(RoomSnapshot::new("W1N1"));
    world.set_visible("W1N1", false);
    world.add_construction_site("site_w1n1", "W1N1");
    world.add_flag("scout_1", Position::new("W1N1", 25, 25));
    world
}

fn apply_busy(world: &mut SimWorld, busy_until: &AHashMap<String, Tick>) {
    let now = world.time();
    for name in world.rooms() {
        if let Some(room) = world.room_mut(name.as_str()) {
            for spawn in room.spawns.iter_mut() {
                spawn.busy = busy_until.get(&spawn.id).is_some_and(|until| *until > now);
            }
        }
    }
}

/// Remote mining: one miner mission per source, spawned from the nearest idle room
struct MiningOperation;

impl OperationBehavior for MiningOperation {
    fn init_operation(&mut self, ctx: &mut OperationContext<'_>) -> Result<()> {
        let limit = ctx.config.default_spawn_distance;
        if ctx.state.memory().spawn_room.is_none() {
            ctx.assign_remote_spawn_group(limit, 2);
        }
        let count = ctx.state.sources().len();
        for i in 0..count {
            let name = format!("miner_{}", i);
            if !ctx.missions.contains(&name) {
                ctx.add_mission(Box::new(Miner::new(name)));
            }
        }
        Ok(())
    }

    fn finalize_operation(&mut self, _ctx: &mut OperationContext<'_>) -> Result<()> {
        Ok(())
    }

    fn invalidate_operation_cache(&mut self, ctx: &mut OperationContext<'_>) -> Result<()> {
        ctx.state.memory_mut().spawn_rooms = None;
        ctx.state.memory_mut().next_spawn_check = None;
        Ok(())
    }
}

struct Miner {
    name: String,
    alive: u32,
    next_attempt: Tick,
    travel: Option<u32>,
}

impl Miner {
    fn new(name: String) -> Self {
        Self {
            name,
            alive: 0,
            next_attempt: 0,
            travel: None,
        }
    }
}

impl Mission for Miner {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &mut MissionContext<'_>) -> Result<()> {
        if self.travel.is_none() {
            let anchor = &ctx.operation.anchor().room;
            self.travel = ctx
                .operation
                .spawn_room()
                .map(|room| ctx.distance.room_distance(room, anchor));
        }
        Ok(())
    }

    fn role_call(&mut self, ctx: &mut MissionContext<'_>) -> Result<()> {
        let max = ctx.memory(&self.name).and_then(|m| m.max).unwrap_or(1);
        if self.alive >= max || ctx.tick < self.next_attempt {
            return Ok(());
        }
        let request = SpawnRequest::new(format!("{}_{}", self.name, ctx.tick), "miner", 550);
        match ctx.spawn(request) {
            Ok(_) => self.alive += 1,
            Err(e) => {
                tracing::debug!(mission = %self.name, error = %e, "spawn deferred");
                // Back off longer when the spawn room is far away
                self.next_attempt = ctx.tick + 10 + Tick::from(self.travel.unwrap_or(0));
            }
        }
        Ok(())
    }

    fn actions(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
        Ok(())
    }

    fn finalize(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
        Ok(())
    }

    fn invalidate_cache(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
        // Workers expire eventually; recount from scratch
        self.alive = 0;
        Ok(())
    }

    fn invalidate_spawn_distance(&mut self) {
        self.travel = None;
    }
}

/// Keeps an eye on a room; fails loudly while the room is dark
struct ScoutOperation;

impl OperationBehavior for ScoutOperation {
    fn init_operation(&mut self, ctx: &mut OperationContext<'_>) -> Result<()> {
        if !ctx.missions.contains("scout") {
            ctx.add_mission(Box::new(Scout));
        }
        Ok(())
    }

    fn finalize_operation(&mut self, _ctx: &mut OperationContext<'_>) -> Result<()> {
        Ok(())
    }

    fn invalidate_operation_cache(&mut self, _ctx: &mut OperationContext<'_>) -> Result<()> {
        Ok(())
    }
}

struct Scout;

impl Mission for Scout {
    fn name(&self) -> &str {
        "scout"
    }

    fn init(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
        Ok(())
    }

    fn role_call(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
        Ok(())
    }

    fn actions(&mut self, ctx: &mut MissionContext<'_>) -> Result<()> {
        if ctx.tick % 500 == 0 && !ctx.operation.has_vision() {
            return Err(EmpireError::hook(
                "actions",
                format!("no vision of {}", ctx.operation.anchor().room),
            ));
        }
        Ok(())
    }

    fn finalize(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
        Ok(())
    }

    fn invalidate_cache(&mut self, _ctx: &mut MissionContext<'_>) -> Result<()> {
        Ok(())
    }
}
