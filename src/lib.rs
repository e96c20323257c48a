//! Empire Ops - a periodic control loop for a room-based colony
//!
//! An [`empire::Empire`] drives flag-anchored [`operation::Operation`]s, each
//! made of [`mission::Mission`]s, through five phases per tick. Operations
//! share one [`spawn::SpawnRegistry`] and pick remote spawn groups through a
//! cached, backed-off ranking. The engine is reached only through the traits
//! in [`host`].

pub mod core;
pub mod empire;
pub mod host;
pub mod mission;
pub mod operation;
pub mod spawn;
