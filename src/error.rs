//! Error taxonomy shared by the store, the permission model and the authenticator.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ETag;

/// Errors surfaced by `groupconf-core`.
///
/// Administrative callers map `Conflict` to a failed precondition and `NotFound` to absence.
/// Connecting clients only ever observe `NotAuthorised`, which deliberately carries no detail.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("invalid group name '{name}'")]
    InvalidName { name: String },

    #[error("group '{name}' not found")]
    NotFound { name: String },

    #[error("tag mismatch for group '{name}': expected {expected}, found {current}")]
    Conflict {
        name: String,
        expected: ETag,
        current: ETag,
    },

    #[error("malformed group configuration '{}': {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    #[error("unknown role '{role}'")]
    UnknownRole { role: String },

    #[error("invalid permission format: {reason}")]
    InvalidPermissionFormat { reason: String },

    #[error("not authorised")]
    NotAuthorised,

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode group configuration: {0}")]
    Encode(#[source] serde_json::Error),
}

impl GroupError {
    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
        }
    }

    /// True for every flavour of absence, including a file that vanished between
    /// resolution and read.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, GroupError>;
