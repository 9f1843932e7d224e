//! Session snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eduadmin_auth::{Identity, Role};
use eduadmin_core::Location;

/// Token plus the identity it was issued for.
///
/// Token and role only ever exist together, so "role iff token" holds by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub identity: Identity,
    pub authenticated_at: DateTime<Utc>,
}

/// Current authentication state as seen by the guard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
    pending_target: Option<Location>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(credentials: Option<Credentials>, pending_target: Option<Location>) -> Self {
        Self {
            credentials,
            pending_target,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.credentials.as_ref().map(|c| &c.identity)
    }

    pub fn role(&self) -> Option<Role> {
        self.identity().map(|i| i.role)
    }

    pub fn pending_target(&self) -> Option<&Location> {
        self.pending_target.as_ref()
    }
}

/// Persisted form of the identity record (`identity` key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IdentityRecord {
    #[serde(flatten)]
    pub identity: Identity,
    pub authenticated_at: DateTime<Utc>,
}

/// Persisted form of the pending target (`pending_target` key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PendingTargetRecord {
    pub location: Location,
    pub saved_at: DateTime<Utc>,
}
