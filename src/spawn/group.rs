//! Spawn group - the production capacity of one owned room
//!
//! A spawn group wraps every spawn facility of a room and exposes a single
//! availability signal in [0, 1]. It is re-derived from the room snapshot
//! the first time it is touched each tick, so the signal is never stale.
//! Requests accepted during a tick claim an idle spawn and are queued as
//! [`SpawnOrder`]s until the empire drains them at the end of the tick.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{EmpireError, Result};
use crate::core::types::{RoomName, Tick};
use crate::host::world::RoomSnapshot;

/// A request to produce one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub name: String,
    pub role: String,
    /// Energy cost of the requested body
    pub body_cost: u32,
}

impl SpawnRequest {
    pub fn new(name: impl Into<String>, role: impl Into<String>, body_cost: u32) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            body_cost,
        }
    }
}

/// A request accepted by a spawn group, waiting to be handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnOrder {
    pub id: Uuid,
    pub tick: Tick,
    pub room: RoomName,
    pub spawn_id: String,
    pub request: SpawnRequest,
}

#[derive(Debug, Clone)]
pub struct SpawnGroup {
    room: RoomName,
    level: u8,
    spawn_count: usize,
    idle_spawns: Vec<String>,
    energy_available: u32,
    energy_capacity: u32,
    refreshed_at: Option<Tick>,
    pending: Vec<SpawnOrder>,
}

impl SpawnGroup {
    /// Whether a room can host a spawn group
    ///
    /// The controller must be ours and at least `min_level`, and the room must
    /// hold at least one of our spawns.
    pub fn is_eligible(snapshot: &RoomSnapshot, min_level: u8) -> bool {
        let level = snapshot.owned_level();
        level > 0 && level >= min_level && snapshot.my_spawns().next().is_some()
    }

    /// Build a spawn group from a room snapshot, `None` if ineligible
    pub fn from_room(snapshot: &RoomSnapshot, min_level: u8, tick: Tick) -> Option<Self> {
        if !Self::is_eligible(snapshot, min_level) {
            return None;
        }
        let mut group = Self {
            room: snapshot.name.clone(),
            level: 0,
            spawn_count: 0,
            idle_spawns: Vec::new(),
            energy_available: 0,
            energy_capacity: 0,
            refreshed_at: None,
            pending: Vec::new(),
        };
        group.refresh(Some(snapshot), tick);
        Some(group)
    }

    /// Re-derive the live signals from the room
    ///
    /// Without vision the group reports itself fully busy until the room is
    /// observed again.
    pub fn refresh(&mut self, snapshot: Option<&RoomSnapshot>, tick: Tick) {
        self.refreshed_at = Some(tick);
        let Some(snapshot) = snapshot else {
            self.idle_spawns.clear();
            self.energy_available = 0;
            return;
        };

        self.level = snapshot.owned_level();
        self.energy_available = snapshot.energy_available;
        self.energy_capacity = snapshot.energy_capacity;

        let claimed: Vec<&str> = self
            .pending
            .iter()
            .filter(|o| o.tick == tick)
            .map(|o| o.spawn_id.as_str())
            .collect();
        let mine: Vec<_> = snapshot.my_spawns().collect();
        self.spawn_count = mine.len();
        self.idle_spawns = mine
            .iter()
            .filter(|s| !s.busy && !claimed.contains(&s.id.as_str()))
            .map(|s| s.id.clone())
            .collect();
    }

    pub fn is_stale(&self, tick: Tick) -> bool {
        self.refreshed_at != Some(tick)
    }

    pub fn room(&self) -> &RoomName {
        &self.room
    }

    /// Controller level of the hosting room
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Fraction of spawns currently idle (1.0 = fully idle)
    pub fn availability(&self) -> f32 {
        if self.spawn_count == 0 {
            return 0.0;
        }
        self.idle_spawns.len() as f32 / self.spawn_count as f32
    }

    /// At least one spawn can take a request this tick
    pub fn is_available(&self) -> bool {
        !self.idle_spawns.is_empty()
    }

    pub fn energy_available(&self) -> u32 {
        self.energy_available
    }

    pub fn energy_capacity(&self) -> u32 {
        self.energy_capacity
    }

    /// Claim an idle spawn for `request`
    pub fn spawn(&mut self, request: SpawnRequest, tick: Tick) -> Result<Uuid> {
        if request.body_cost > self.energy_capacity {
            return Err(self.reject(format!(
                "body cost {} exceeds room capacity {}",
                request.body_cost, self.energy_capacity
            )));
        }
        if request.body_cost > self.energy_available {
            return Err(self.reject(format!(
                "body cost {} exceeds available energy {}",
                request.body_cost, self.energy_available
            )));
        }
        if !self.is_available() {
            return Err(self.reject("no idle spawn".to_string()));
        }

        let spawn_id = self.idle_spawns.remove(0);
        self.energy_available -= request.body_cost;

        let id = Uuid::new_v4();
        tracing::debug!(room = %self.room, spawn = %spawn_id, name = %request.name, "spawn queued");
        self.pending.push(SpawnOrder {
            id,
            tick,
            room: self.room.clone(),
            spawn_id,
            request,
        });
        Ok(id)
    }

    /// Orders accepted since the last drain
    pub fn pending(&self) -> &[SpawnOrder] {
        &self.pending
    }

    pub fn drain_orders(&mut self) -> Vec<SpawnOrder> {
        std::mem::take(&mut self.pending)
    }

    fn reject(&self, reason: String) -> EmpireError {
        EmpireError::SpawnRejected {
            room: self.room.clone(),
            reason,
        }
    }
}
