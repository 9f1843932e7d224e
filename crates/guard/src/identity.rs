//! Identity collaborator ("who is the current user?").

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use eduadmin_auth::Identity;
use eduadmin_session::Session;

use crate::ServiceError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("identity service failed: {0}")]
    Service(#[from] ServiceError),
}

/// Resolves the identity behind a session.
///
/// `Ok(None)` for a session that holds a token means the token is no longer
/// recognised; the guard then treats the requester as anonymous.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_identity(&self, session: &Session) -> Result<Option<Identity>, IdentityError>;
}

/// Trusts the identity record cached in the session store.
#[derive(Debug, Default, Clone, Copy)]
pub struct CachedIdentity;

#[async_trait]
impl IdentityProvider for CachedIdentity {
    async fn current_identity(&self, session: &Session) -> Result<Option<Identity>, IdentityError> {
        Ok(session.identity().cloned())
    }
}
