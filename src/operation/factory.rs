//! Operation factory for building operations from anchor flags.
//!
//! A flag named `{type}_{suffix}` becomes an operation of that type when a
//! behavior is registered for the type tag. Waypoint flags
//! (`{name}_waypoints_{i}`) belong to an existing operation and are skipped.

use ahash::AHashMap;

use crate::core::error::{EmpireError, Result};
use crate::core::types::OperationPriority;
use crate::host::world::Flag;
use crate::operation::operation::{Operation, OperationBehavior, OperationState};

type BehaviorBuilder = Box<dyn Fn(&Flag) -> Box<dyn OperationBehavior>>;

struct Registration {
    priority: OperationPriority,
    build: BehaviorBuilder,
}

/// Registry of operation types
#[derive(Default)]
pub struct OperationFactory {
    types: AHashMap<String, Registration>,
}

impl OperationFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior constructor for a type tag
    pub fn register<F>(&mut self, type_tag: &str, priority: OperationPriority, build: F)
    where
        F: Fn(&Flag) -> Box<dyn OperationBehavior> + 'static,
    {
        self.types.insert(
            type_tag.to_string(),
            Registration {
                priority,
                build: Box::new(build),
            },
        );
    }

    pub fn is_registered(&self, type_tag: &str) -> bool {
        self.types.contains_key(type_tag)
    }

    /// Type tag of an operation flag, `None` for waypoints and untagged names
    pub fn type_tag(flag_name: &str) -> Option<&str> {
        if flag_name.contains("_waypoints_") {
            return None;
        }
        let (tag, suffix) = flag_name.split_once('_')?;
        if tag.is_empty() || suffix.is_empty() {
            return None;
        }
        Some(tag)
    }

    /// Build the operation anchored on `flag`
    pub fn build(&self, flag: &Flag) -> Result<Operation> {
        let tag = Self::type_tag(&flag.name)
            .ok_or_else(|| EmpireError::UnknownOperationType(flag.name.clone()))?;
        let registration = self
            .types
            .get(tag)
            .ok_or_else(|| EmpireError::UnknownOperationType(tag.to_string()))?;

        let state = OperationState::new(flag.name.clone(), tag, flag.clone(), registration.priority);
        Ok(Operation::new(state, (registration.build)(flag)))
    }
}
