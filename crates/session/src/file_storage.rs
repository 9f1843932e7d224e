//! JSON-file backed key-value storage.
//!
//! The whole profile is one JSON object. Every batch rewrites the document
//! into a sibling temp file, syncs it and renames it over the original, so
//! a crash leaves either the old or the new document on disk. A corrupt
//! document fails reads; the next write starts over from an empty one.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::storage::{KeyValueStorage, StorageError, WriteBatch};

#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Open (or lazily create) the document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            StorageError::Corrupt(format!("{}: {e}", self.path.display()))
        })
    }

    fn write_document(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut document = self.read_document()?;
        Ok(document.remove(key))
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut document = match self.read_document() {
            Ok(document) => document,
            // Rewriting from scratch is the only way out of a corrupt file.
            Err(StorageError::Corrupt(reason)) => {
                warn!(path = %self.path.display(), reason = %reason, "resetting corrupt session document");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        let ops = batch.ops().len();
        batch.apply_to(&mut document);
        self.write_document(&document)?;

        debug!(path = %self.path.display(), ops, "storage batch committed");
        Ok(())
    }
}
