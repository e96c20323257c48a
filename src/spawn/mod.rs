//! Spawn layer - production capacity and its registry

pub mod group;
pub mod registry;

pub use group::{SpawnGroup, SpawnOrder, SpawnRequest};
pub use registry::SpawnRegistry;
