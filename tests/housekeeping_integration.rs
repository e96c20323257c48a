//! Integration tests for construction-site anomaly housekeeping
//!
//! Sites in rooms we cannot see are flagged on one pass and removed on the
//! next; visibility or the sites disappearing resolves the flag instead.

use empire_ops::core::types::{RoomName, Tick};
use empire_ops::core::{EmpireConfig, InvalidationSchedule};
use empire_ops::empire::Empire;
use empire_ops::host::{
    EventLog, Host, LinearDistance, NullOverlay, RoomSnapshot, SimWorld, TickProfiler, WorldState,
};

const INTERVAL: Tick = 1_000;

struct Rig {
    world: SimWorld,
    log: EventLog,
    empire: Empire,
}

impl Rig {
    fn new() -> Self {
        let config = EmpireConfig {
            invalidation: InvalidationSchedule::Random { chance: 0.0 },
            construction_check_interval: INTERVAL,
            ..Default::default()
        };
        Self {
            world: SimWorld::new(),
            log: EventLog::new(),
            empire: Empire::new(config).unwrap(),
        }
    }

    fn hidden_room(&mut self, name: &str) {
        self.world.add_room(RoomSnapshot::new(name));
        self.world.set_visible(name, false);
    }

    fn tick_at(&mut self, tick: Tick) {
        self.world.time = tick;
        let distance = LinearDistance::new();
        let mut profiler = TickProfiler::new(1000.0);
        let mut overlay = NullOverlay;
        let mut host = Host {
            world: &mut self.world,
            distance: &distance,
            instrument: &mut profiler,
            reports: &mut self.log,
            overlay: &mut overlay,
        };
        self.empire.run_tick(&mut host);
    }

    fn flagged(&self, room: &str) -> bool {
        self.empire.memory().is_flagged(&RoomName::from(room))
    }

    fn site_ids(&self) -> Vec<String> {
        self.world.construction_sites().into_iter().map(|s| s.id).collect()
    }
}

// ============================================================================
// Escalation
// ============================================================================

#[test]
fn test_hidden_sites_removed_on_second_pass() {
    let mut rig = Rig::new();
    rig.hidden_room("W1N1");
    rig.world.add_construction_site("a", "W1N1");
    rig.world.add_construction_site("b", "W1N1");

    rig.tick_at(0);
    assert!(rig.flagged("W1N1"));
    assert_eq!(rig.site_ids(), vec!["a", "b"]);

    // Between passes nothing happens
    rig.tick_at(999);
    assert_eq!(rig.site_ids().len(), 2);

    rig.tick_at(INTERVAL);
    assert!(rig.site_ids().is_empty());
    assert!(!rig.flagged("W1N1"));
    let removals: Vec<_> = rig
        .log
        .events
        .iter()
        .filter(|e| e.message == "EMPIRE: removed construction sites in W1N1")
        .collect();
    assert_eq!(removals.len(), 1, "one report per room");
    assert_eq!(removals[0].tick, INTERVAL);
}

#[test]
fn test_site_placed_after_flag_removed_with_room() {
    let mut rig = Rig::new();
    rig.hidden_room("W1N1");
    rig.world.add_construction_site("a", "W1N1");
    rig.tick_at(0);

    rig.world.add_construction_site("late", "W1N1");
    rig.tick_at(INTERVAL);
    assert!(rig.site_ids().is_empty());
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_vision_resolves_flag() {
    let mut rig = Rig::new();
    rig.hidden_room("W1N1");
    rig.world.add_construction_site("a", "W1N1");
    rig.tick_at(0);
    assert!(rig.flagged("W1N1"));

    rig.world.set_visible("W1N1", true);
    rig.tick_at(INTERVAL);

    assert!(!rig.flagged("W1N1"));
    assert_eq!(rig.site_ids(), vec!["a"], "visible sites are kept");
    assert!(rig.log.contains("EMPIRE: construction anomaly in W1N1 resolved"));
}

#[test]
fn test_vanished_sites_resolve_flag() {
    let mut rig = Rig::new();
    rig.hidden_room("W1N1");
    rig.world.add_construction_site("a", "W1N1");
    rig.tick_at(0);

    rig.world.remove_construction_site("a");
    rig.tick_at(INTERVAL);

    assert!(!rig.flagged("W1N1"));
    assert!(rig.log.contains("EMPIRE: construction anomaly in W1N1 resolved"));
}

#[test]
fn test_rooms_tracked_independently() {
    let mut rig = Rig::new();
    rig.hidden_room("W1N1");
    rig.hidden_room("W2N2");
    rig.world.add_room(RoomSnapshot::new("E1N1"));
    rig.world.add_construction_site("a", "W1N1");
    rig.world.add_construction_site("v", "E1N1");
    rig.tick_at(0);
    assert!(rig.flagged("W1N1"));
    assert!(!rig.flagged("E1N1"), "visible rooms are never flagged");

    // W2N2 gets its first site only now: flagged, not removed
    rig.world.add_construction_site("b", "W2N2");
    rig.tick_at(INTERVAL);

    assert_eq!(rig.site_ids(), vec!["v", "b"]);
    assert!(!rig.flagged("W1N1"));
    assert!(rig.flagged("W2N2"));

    rig.tick_at(2 * INTERVAL);
    assert_eq!(rig.site_ids(), vec!["v"]);
    assert!(rig.empire.memory().errant_construction_rooms.is_empty());
}
