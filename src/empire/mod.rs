//! Empire layer - orchestration, housekeeping, persistence

#[allow(clippy::module_inception)]
pub mod empire;
pub mod memory;

pub use empire::{Empire, SpawnRoomTarget, TickReport};
pub use memory::EmpireMemory;
