//! Result shapes of the data-access collaborators.
//!
//! The guard never inspects collaborator payloads. It only cares whether a
//! call failed, and in particular whether the failure means the session
//! token was rejected.

use thiserror::Error;

/// Maximum length for response bodies kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unauthorized - token may be expired")]
    Unauthorized,

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("server error: {0}")]
    Server(String),
}

impl ServiceError {
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    /// Classify an HTTP status returned by a collaborator.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = Self::truncate_body(body);
        match status {
            400 | 422 => ServiceError::Validation(body),
            401 => ServiceError::Unauthorized,
            403 => ServiceError::Forbidden(body),
            404 => ServiceError::NotFound(body),
            408 | 504 => ServiceError::Timeout,
            _ => ServiceError::Server(format!("status {status}: {body}")),
        }
    }

    /// The collaborator rejected the session token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Unauthorized)
    }
}
