use thiserror::Error;

/// Failures surfaced by the staging write side.
///
/// Staging errors are synchronous and leave the rest of the overlay
/// untouched; a failed call never corrupts other pending changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StagingError {
    #[error("Queue not found: {path}")]
    NotFound { path: String },

    #[error("Conflicting pending change on {path}: {reason}")]
    Conflict { path: String, reason: String },

    #[error("Invalid queue path: {path}")]
    InvalidPath { path: String },

    #[error("No staged change with id {id}")]
    UnknownChange { id: String },
}

impl StagingError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn conflict(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }
}
