//! Host collaborators - world, distance, instrumentation, reporting
//!
//! The control loop consumes its environment through these narrow traits.
//! [`Host`] bundles one of each so phase methods take a single context.

pub mod distance;
pub mod instrument;
pub mod report;
pub mod sim;
pub mod world;

pub use distance::{DistanceService, LinearDistance};
pub use instrument::{Instrumentation, TickProfiler, TICK_START_LABEL};
pub use report::{DebugOverlay, EventLog, LoggedEvent, NullOverlay, ReportSink};
pub use sim::SimWorld;
pub use world::{
    ConstructionSite, Controller, Flag, Mineral, ObjectKind, RoomSnapshot, SpawnFacility,
    WorldState,
};

/// Collaborators borrowed for the duration of one phase call
pub struct Host<'a> {
    pub world: &'a mut dyn WorldState,
    pub distance: &'a dyn DistanceService,
    pub instrument: &'a mut dyn Instrumentation,
    pub reports: &'a mut dyn ReportSink,
    pub overlay: &'a mut dyn DebugOverlay,
}
