//! String-valued key-value storage (the browser-profile "local storage").
//!
//! Writes are expressed as a [`WriteBatch`] and applied atomically: either
//! every operation in the batch becomes visible, or none does.

use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage document is corrupt: {0}")]
    Corrupt(String),

    #[error("storage lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
}

/// Ordered set of writes applied as one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Remove { key: key.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Apply the batch to an in-memory map.
    pub fn apply_to(self, entries: &mut BTreeMap<String, String>) {
        for op in self.ops {
            match op {
                WriteOp::Set { key, value } => {
                    entries.insert(key, value);
                }
                WriteOp::Remove { key } => {
                    entries.remove(&key);
                }
            }
        }
    }
}

/// Durable key-value storage abstraction.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Apply every write in `batch` in one transaction.
    fn apply(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

/// In-memory storage for tests/dev.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored key (test helper).
    pub fn snapshot(&self) -> Result<BTreeMap<String, String>, StorageError> {
        Ok(self.entries.read().map_err(|_| StorageError::Poisoned)?.clone())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        batch.apply_to(&mut entries);
        Ok(())
    }
}
