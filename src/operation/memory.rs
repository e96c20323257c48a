//! Persisted per-operation state
//!
//! Everything here survives across ticks (and process restarts, through
//! [`crate::empire::EmpireMemory`]): the ranked spawn candidates with their
//! recheck deadline, and the administrative overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{OperationPriority, RoomName, Tick};

/// A ranked spawn room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnCandidate {
    pub room: RoomName,
    pub distance: u32,
}

/// Overrides for one mission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionMemory {
    /// Cap on the number of workers the mission keeps alive
    pub max: Option<u32>,
    /// Structure the mission should repair first
    pub repair_target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationMemory {
    /// Cached ranking, nearest first; `None` when the last ranking was empty
    pub spawn_rooms: Option<Vec<SpawnCandidate>>,
    /// Tick at or after which the ranking is recomputed
    pub next_spawn_check: Option<Tick>,
    /// Administrative spawn room override
    pub spawn_room: Option<RoomName>,
    /// Travel to the spawn room goes through the waypoint route
    pub portal_travel: bool,
    pub priority: Option<OperationPriority>,
    pub missions: BTreeMap<String, MissionMemory>,
}

impl OperationMemory {
    /// Whether the ranking must be recomputed at `tick`
    pub fn spawn_check_due(&self, tick: Tick) -> bool {
        self.next_spawn_check.map_or(true, |next| tick >= next)
    }

    /// Pull the recheck deadline forward to `deadline`, never pushing it back
    pub fn pull_spawn_check(&mut self, deadline: Tick) {
        self.next_spawn_check = Some(match self.next_spawn_check {
            Some(current) => current.min(deadline),
            None => deadline,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_check_due() {
        let mut memory = OperationMemory::default();
        assert!(memory.spawn_check_due(0));

        memory.next_spawn_check = Some(100);
        assert!(!memory.spawn_check_due(99));
        assert!(memory.spawn_check_due(100));
    }

    #[test]
    fn test_pull_never_pushes_back() {
        let mut memory = OperationMemory {
            next_spawn_check: Some(500),
            ..Default::default()
        };
        memory.pull_spawn_check(800);
        assert_eq!(memory.next_spawn_check, Some(500));
        memory.pull_spawn_check(200);
        assert_eq!(memory.next_spawn_check, Some(200));
    }

    #[test]
    fn test_missing_fields_default() {
        let memory: OperationMemory =
            serde_json::from_str(r#"{"spawn_room":"E1N1","missions":{"miner":{"max":3}}}"#).unwrap();
        assert_eq!(memory.spawn_room, Some(RoomName::from("E1N1")));
        assert_eq!(memory.missions["miner"].max, Some(3));
        assert!(memory.missions["miner"].repair_target.is_none());
        assert!(memory.next_spawn_check.is_none());
    }
}
