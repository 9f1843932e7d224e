//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic input failures (malformed paths,
/// unknown role names). Storage and collaborator failures belong to the
/// crates that own those concerns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A path could not be interpreted as an in-app location.
    #[error("invalid location '{path}': {reason}")]
    InvalidLocation { path: String, reason: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_location(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
