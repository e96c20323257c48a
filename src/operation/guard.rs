//! Failure isolation at hook boundaries
//!
//! Every hook call goes through [`guard`], which turns both `Err` returns and
//! panics into a [`HookFailure`] so the caller can move on to the next
//! sibling.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::core::error::{EmpireError, Result};
use crate::core::types::Tick;

/// Phases of the tick cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    RoleCall,
    Actions,
    Finalize,
    InvalidateCache,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::RoleCall => "role_call",
            Phase::Actions => "actions",
            Phase::Finalize => "finalize",
            Phase::InvalidateCache => "invalidate_cache",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A hook that failed and was absorbed
#[derive(Debug)]
pub struct HookFailure {
    pub tick: Tick,
    pub phase: Phase,
    pub operation: String,
    /// `None` when the operation's own hook failed
    pub mission: Option<String>,
    pub error: EmpireError,
}

/// Run one hook, absorbing errors and panics
pub fn guard<F>(
    tick: Tick,
    phase: Phase,
    operation: &str,
    mission: Option<&str>,
    hook: F,
) -> Option<HookFailure>
where
    F: FnOnce() -> Result<()>,
{
    let error = match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => return None,
        Ok(Err(error)) => error,
        Err(payload) => EmpireError::HookPanicked {
            phase: phase.to_string(),
            message: panic_message(payload.as_ref()),
        },
    };

    tracing::error!(
        tick,
        phase = %phase,
        operation,
        mission = mission.unwrap_or("-"),
        error = %error,
        "hook failed"
    );

    Some(HookFailure {
        tick,
        phase,
        operation: operation.to_string(),
        mission: mission.map(str::to_string),
        error,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
