//! Persisted empire state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::Result;
use crate::core::types::RoomName;
use crate::operation::memory::OperationMemory;

/// Everything the empire keeps across ticks and restarts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpireMemory {
    /// Rooms holding construction sites we could not see at the last check
    pub errant_construction_rooms: BTreeMap<RoomName, bool>,
    /// Per-operation memory, keyed by operation name
    pub operations: BTreeMap<String, OperationMemory>,
}

impl EmpireMemory {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_flagged(&self, room: &RoomName) -> bool {
        self.errant_construction_rooms.get(room).copied().unwrap_or(false)
    }
}
