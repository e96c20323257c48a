//! Empire configuration with documented constants
//!
//! All tuning numbers of the control loop are collected here with
//! explanations of their purpose and how they interact with each other.
//! Every field has a default, so a TOML file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{EmpireError, Result};
use crate::core::types::Tick;

/// How operations decide when to invalidate their caches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidationSchedule {
    /// Each operation rolls independently every tick
    Random { chance: f64 },
    /// Each operation invalidates once per `period` ticks, offset by a
    /// stable hash of its name so operations do not all fire together
    Staggered { period: Tick },
}

/// Configuration for the empire control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpireConfig {
    // === SPAWN GROUP ELIGIBILITY ===
    /// Minimum controller level for a room to host a spawn group
    ///
    /// Level 0 controllers cannot run spawns, so anything below 1 would
    /// register rooms that can never produce.
    pub min_spawn_level: u8,

    // === REMOTE SPAWN ALLOCATION ===
    /// Extra rooms tolerated beyond a caller's distance limit
    ///
    /// Linear room distance and real travel distance disagree slightly near
    /// map edges; the slack keeps borderline rooms in the candidate list.
    pub distance_slack: u32,

    /// Ticks until the candidate ranking is recomputed after it found rooms
    ///
    /// A good answer rarely changes, so this is long (about 10 hours of
    /// real time at 3.5 s per tick).
    pub spawn_check_found: Tick,

    /// Ticks until the ranking is recomputed after it found nothing
    pub spawn_check_empty: Tick,

    /// Upper bound on the recheck deadline whenever a lookup returns nothing
    ///
    /// Must be shorter than `spawn_check_empty` so failed lookups retry
    /// sooner than the empty-ranking back-off alone would allow.
    pub spawn_check_retry: Tick,

    /// Default distance limit used when an operation has no spawn room of its own
    pub default_spawn_distance: u32,

    // === LOAD ===
    /// Fraction of the tick budget above which optional work is skipped
    pub cpu_limit: f64,

    /// Tick budget in milliseconds used by the profiler
    pub tick_budget_ms: f64,

    // === HOUSEKEEPING ===
    /// Ticks between construction-site anomaly reconciliation passes
    pub construction_check_interval: Tick,

    /// Schedule for operation/mission cache invalidation
    pub invalidation: InvalidationSchedule,

    /// Seed for the invalidation roll, so runs are reproducible
    pub seed: u64,

    // === ADMINISTRATION ===
    /// Largest value accepted by the `set_max` override
    pub max_mission_cap: u32,

    /// Number of sequential waypoint flags scanned per operation
    pub max_waypoints: usize,
}

impl Default for EmpireConfig {
    fn default() -> Self {
        Self {
            min_spawn_level: 1,

            distance_slack: 1,
            spawn_check_found: 10_000,
            spawn_check_empty: 1_000,
            spawn_check_retry: 100,
            default_spawn_distance: 4,

            cpu_limit: 0.9,
            tick_budget_ms: 20.0,

            construction_check_interval: 1_000,
            invalidation: InvalidationSchedule::Random { chance: 0.01 },
            seed: 0x5eed,

            max_mission_cap: 50,
            max_waypoints: 100,
        }
    }
}

impl EmpireConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(EmpireError::InvalidConfig)?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        // Back-off must shrink as the lookup gets less successful
        if self.spawn_check_found <= self.spawn_check_empty {
            return Err(format!(
                "spawn_check_found ({}) should be > spawn_check_empty ({})",
                self.spawn_check_found, self.spawn_check_empty
            ));
        }
        if self.spawn_check_empty <= self.spawn_check_retry {
            return Err(format!(
                "spawn_check_empty ({}) should be > spawn_check_retry ({})",
                self.spawn_check_empty, self.spawn_check_retry
            ));
        }
        if self.spawn_check_retry == 0 {
            return Err("spawn_check_retry must be positive".into());
        }

        if !(0.0..=1.0).contains(&self.cpu_limit) {
            return Err(format!("cpu_limit ({}) should be within 0..=1", self.cpu_limit));
        }
        if self.tick_budget_ms <= 0.0 {
            return Err("tick_budget_ms must be positive".into());
        }

        if self.construction_check_interval == 0 {
            return Err("construction_check_interval must be positive".into());
        }

        match self.invalidation {
            InvalidationSchedule::Random { chance } if !(0.0..=1.0).contains(&chance) => {
                return Err(format!("invalidation chance ({}) should be within 0..=1", chance));
            }
            InvalidationSchedule::Staggered { period: 0 } => {
                return Err("invalidation period must be positive".into());
            }
            _ => {}
        }

        Ok(())
    }
}
