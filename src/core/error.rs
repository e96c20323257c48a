use thiserror::Error;

use crate::core::types::RoomName;

#[derive(Error, Debug)]
pub enum EmpireError {
    #[error("{phase} hook failed: {reason}")]
    HookFailed { phase: String, reason: String },

    #[error("{phase} hook panicked: {message}")]
    HookPanicked { phase: String, message: String },

    #[error("No spawn groups are registered")]
    NoSpawnGroups,

    #[error("Spawn group {room} rejected request: {reason}")]
    SpawnRejected { room: RoomName, reason: String },

    #[error("Unknown operation type: {0}")]
    UnknownOperationType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl EmpireError {
    /// Shorthand for a hook reporting a recoverable failure
    pub fn hook(phase: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HookFailed {
            phase: phase.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmpireError>;
