pub mod config;
pub mod error;
pub mod types;

pub use config::{EmpireConfig, InvalidationSchedule};
pub use error::{EmpireError, Result};
pub use types::{OperationPriority, Position, RoomName, Tick};
