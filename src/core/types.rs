//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Name of a room (region) on the world map, e.g. `"W3N7"`
///
/// Names following the `[WE]<x>[NS]<y>` convention carry map coordinates,
/// which the linear distance service uses. Other names are allowed but have
/// no coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(pub String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// World coordinates of the room, if the name follows the map convention
    ///
    /// West and north halves are mirrored so `W0` sits directly left of `E0`
    /// (x = -1 and x = 0 respectively).
    pub fn coords(&self) -> Option<(i32, i32)> {
        let bytes = self.0.as_bytes();
        let horizontal = *bytes.first()?;
        let split = self.0.get(1..)?.find(['N', 'S'])? + 1;
        let vertical = bytes[split];

        let x: u32 = self.0.get(1..split)?.parse().ok()?;
        let y: u32 = self.0.get(split + 1..)?.parse().ok()?;
        let (x, y) = (i32::try_from(x).ok()?, i32::try_from(y).ok()?);

        let x = match horizontal {
            b'E' => x,
            b'W' => -x - 1,
            _ => return None,
        };
        let y = match vertical {
            b'S' => y,
            b'N' => -y - 1,
            _ => return None,
        };
        Some((x, y))
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A tile position inside a room (0..50 on both axes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub room: RoomName,
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub fn new(room: impl Into<RoomName>, x: u8, y: u8) -> Self {
        Self {
            room: room.into(),
            x,
            y,
        }
    }

    /// Chebyshev range to another position in the same room
    ///
    /// Positions in different rooms are treated as out of range.
    pub fn range_to(&self, other: &Position) -> u32 {
        if self.room != other.room {
            return u32::MAX;
        }
        let dx = (self.x as i32 - other.x as i32).unsigned_abs();
        let dy = (self.y as i32 - other.y as i32).unsigned_abs();
        dx.max(dy)
    }
}

/// Priority of an operation (lower value = more important)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationPriority {
    Emergency = 0,
    OwnedRoom = 1,
    VeryHigh = 2,
    High = 3,
    Medium = 4,
    Low = 5,
    VeryLow = 6,
}

impl Default for OperationPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl FromStr for OperationPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "emergency" | "0" => Ok(Self::Emergency),
            "ownedroom" | "1" => Ok(Self::OwnedRoom),
            "veryhigh" | "2" => Ok(Self::VeryHigh),
            "high" | "3" => Ok(Self::High),
            "medium" | "4" => Ok(Self::Medium),
            "low" | "5" => Ok(Self::Low),
            "verylow" | "6" => Ok(Self::VeryLow),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}
