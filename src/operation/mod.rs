//! Operations - flag-anchored groups of missions
//!
//! - `operation`: state, phase fan-out, remote spawn allocation, admin commands
//! - `memory`: persisted caches and overrides
//! - `guard`: failure isolation around every hook
//! - `factory`: type-tag registry building operations from flags

pub mod factory;
pub mod guard;
pub mod memory;
#[allow(clippy::module_inception)]
pub mod operation;

pub use factory::OperationFactory;
pub use guard::{guard, HookFailure, Phase};
pub use memory::{MissionMemory, OperationMemory, SpawnCandidate};
pub use operation::{Operation, OperationBehavior, OperationContext, OperationState};
