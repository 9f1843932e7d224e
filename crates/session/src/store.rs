//! Session store abstraction and its key-value backed implementation.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use eduadmin_auth::Identity;
use eduadmin_core::Location;

use crate::session::{Credentials, IdentityRecord, PendingTargetRecord, Session};
use crate::storage::{KeyValueStorage, MemoryStorage, StorageError, WriteBatch};

/// Persisted keys.
pub const TOKEN_KEY: &str = "token";
pub const IDENTITY_KEY: &str = "identity";
pub const PENDING_TARGET_KEY: &str = "pending_target";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("corrupt session record '{key}': {reason}")]
    Corrupt { key: &'static str, reason: String },

    #[error("session token must not be empty")]
    EmptyToken,
}

/// Process-wide session state.
///
/// Only the navigation guard and the login-completion handler write to it;
/// reads are unrestricted.
pub trait SessionStore: Send + Sync {
    /// Current snapshot.
    fn get(&self) -> Result<Session, SessionError>;

    /// Set token and identity in one persisted transaction.
    fn set_authenticated(&self, token: String, identity: Identity) -> Result<(), SessionError>;

    /// Remove token, identity and pending target. Idempotent.
    fn clear(&self) -> Result<(), SessionError>;

    /// Remember the destination to restore after login (overwrites).
    fn save_pending_target(&self, target: Location) -> Result<(), SessionError>;

    /// Return and clear the pending target.
    fn take_pending_target(&self) -> Result<Option<Location>, SessionError>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self) -> Result<Session, SessionError> {
        (**self).get()
    }

    fn set_authenticated(&self, token: String, identity: Identity) -> Result<(), SessionError> {
        (**self).set_authenticated(token, identity)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }

    fn save_pending_target(&self, target: Location) -> Result<(), SessionError> {
        (**self).save_pending_target(target)
    }

    fn take_pending_target(&self) -> Result<Option<Location>, SessionError> {
        (**self).take_pending_target()
    }
}

/// Session store persisted through a [`KeyValueStorage`].
#[derive(Debug)]
pub struct PersistentSessionStore<S> {
    storage: S,
    // Serialises read-modify-write sequences (take_pending_target).
    write_lock: Mutex<()>,
}

/// Session store for tests/dev.
pub type InMemorySessionStore = PersistentSessionStore<MemoryStorage>;

impl InMemorySessionStore {
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }
}

impl<S: KeyValueStorage> PersistentSessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn read_record<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, SessionError> {
        match self.storage.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SessionError::Corrupt {
                    key,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// The pending target is advisory: an unparsable record reads as absent.
    fn read_pending(&self) -> Result<Option<Location>, SessionError> {
        match self.read_record::<PendingTargetRecord>(PENDING_TARGET_KEY) {
            Ok(record) => Ok(record.map(|r| r.location)),
            Err(SessionError::Corrupt { reason, .. }) => {
                warn!(reason = %reason, "ignoring unreadable pending target");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.storage.apply(batch)?;
        Ok(())
    }
}

impl<S: KeyValueStorage> SessionStore for PersistentSessionStore<S> {
    fn get(&self) -> Result<Session, SessionError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let identity = self.read_record::<IdentityRecord>(IDENTITY_KEY)?;

        let credentials = match (token, identity) {
            (Some(token), Some(record)) => Some(Credentials {
                token,
                identity: record.identity,
                authenticated_at: record.authenticated_at,
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(SessionError::Corrupt {
                    key: IDENTITY_KEY,
                    reason: "token present without an identity record".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(SessionError::Corrupt {
                    key: TOKEN_KEY,
                    reason: "identity record present without a token".to_string(),
                });
            }
        };

        Ok(Session::new(credentials, self.read_pending()?))
    }

    fn set_authenticated(&self, token: String, identity: Identity) -> Result<(), SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let record = IdentityRecord {
            identity,
            authenticated_at: Utc::now(),
        };
        let batch = WriteBatch::new()
            .set(TOKEN_KEY, token)
            .set(IDENTITY_KEY, to_json(IDENTITY_KEY, &record)?);
        self.apply(batch)?;

        debug!(username = %record.identity.username, role = %record.identity.role, "session authenticated");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.apply(
            WriteBatch::new()
                .remove(TOKEN_KEY)
                .remove(IDENTITY_KEY)
                .remove(PENDING_TARGET_KEY),
        )?;
        debug!("session cleared");
        Ok(())
    }

    fn save_pending_target(&self, target: Location) -> Result<(), SessionError> {
        let record = PendingTargetRecord {
            location: target,
            saved_at: Utc::now(),
        };
        self.apply(WriteBatch::new().set(PENDING_TARGET_KEY, to_json(PENDING_TARGET_KEY, &record)?))?;
        debug!(target = %record.location, "pending target saved");
        Ok(())
    }

    fn take_pending_target(&self) -> Result<Option<Location>, SessionError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;

        if self.storage.get(PENDING_TARGET_KEY)?.is_none() {
            return Ok(None);
        }
        let pending = self.read_pending()?;
        self.storage
            .apply(WriteBatch::new().remove(PENDING_TARGET_KEY))?;
        Ok(pending)
    }
}

fn to_json<T: Serialize>(key: &'static str, value: &T) -> Result<String, SessionError> {
    serde_json::to_string(value).map_err(|e| SessionError::Corrupt {
        key,
        reason: e.to_string(),
    })
}
