//! `eduadmin-session`: persisted session state for the navigation guard.
//!
//! The store holds the identity token, the role-bearing identity record and
//! the pending-redirect target. Storage is injectable: tests use
//! [`MemoryStorage`], the console uses [`JsonFileStorage`].

pub mod file_storage;
pub mod session;
pub mod storage;
pub mod store;

pub use file_storage::JsonFileStorage;
pub use session::{Credentials, Session};
pub use storage::{KeyValueStorage, MemoryStorage, StorageError, WriteBatch, WriteOp};
pub use store::{
    IDENTITY_KEY, InMemorySessionStore, PENDING_TARGET_KEY, PersistentSessionStore, SessionError,
    SessionStore, TOKEN_KEY,
};
