//! Key-value preference backend.
//!
//! A [`PreferenceStore`] is a shared string-keyed map of byte values, the
//! kind of small settings store applications keep next to their data. Each
//! [`PreferencesBackend`] owns one key in that store and keeps its whole
//! record list there as a single archived value.
//!
//! A store is either purely in-memory or backed by a JSON file that is loaded
//! on open and rewritten after every change.
//!
//! ```
//! use local_storage::{JsonDecoder, JsonEncoder, PreferenceStore, PreferencesBackend, Storage};
//!
//! let store = PreferenceStore::in_memory();
//! let mut recent = PreferencesBackend::new(store.clone(), "recent_searches");
//! recent.append(&"rust".to_owned(), &JsonEncoder::new()).unwrap();
//!
//! assert!(store.contains_key("recent_searches"));
//! let searches: Vec<String> = recent.all(&JsonDecoder::new()).unwrap();
//! assert_eq!(searches, vec!["rust".to_owned()]);
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::{
    archive,
    backend::{Backend, Record},
    error::{StorageError, StorageResult},
    file::{read_or_empty, write_atomically},
    storage::Storage,
};

type Entries = BTreeMap<String, Bytes>;

/// Shared string-keyed byte store.
///
/// `PreferenceStore` is cheaply cloneable via [`Arc`]; all clones share the
/// same entries and the same backing file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    entries: Arc<RwLock<Entries>>,
    file: Option<Arc<PathBuf>>,
}

impl PreferenceStore {
    /// Creates a store that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { entries: Arc::new(RwLock::new(Entries::new())), file: None }
    }

    /// Opens a store persisted at `file`, loading existing entries.
    ///
    /// A missing file is treated as an empty store and created by the first
    /// write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read and
    /// [`StorageError::Corrupted`] if it does not contain a preference map.
    #[instrument(skip_all, fields(file = %file.as_ref().display()))]
    pub fn open(file: impl AsRef<Path>) -> StorageResult<Self> {
        let file = file.as_ref().to_path_buf();
        let contents = read_or_empty(&file)?;

        let entries = if contents.is_empty() {
            Entries::new()
        } else {
            let raw: BTreeMap<String, Vec<u8>> = serde_json::from_slice(&contents).map_err(|e| {
                StorageError::corrupted(file.display().to_string(), format!("invalid preference file: {e}"))
            })?;
            raw.into_iter().map(|(key, value)| (key, Bytes::from(value))).collect()
        };

        debug!(entries = entries.len(), "loaded preference store");
        Ok(Self { entries: Arc::new(RwLock::new(entries)), file: Some(Arc::new(file)) })
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.read().get(key).cloned()
    }

    /// Returns whether a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns all keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the backing file cannot be written; the
    /// in-memory entry is rolled back in that case.
    pub fn set(&self, key: &str, value: Bytes) -> StorageResult<()> {
        let mut entries = self.entries.write();
        let previous = entries.insert(key.to_owned(), value);
        self.flush(&entries).inspect_err(|_| {
            match previous {
                Some(previous) => entries.insert(key.to_owned(), previous),
                None => entries.remove(key),
            };
        })
    }

    /// Removes the value stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the backing file cannot be written; the
    /// in-memory entry is restored in that case.
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        self.flush(&entries).inspect_err(|_| {
            entries.insert(key.to_owned(), previous);
        })
    }

    fn flush(&self, entries: &Entries) -> StorageResult<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let raw: BTreeMap<&str, &[u8]> =
            entries.iter().map(|(key, value)| (key.as_str(), value.as_ref())).collect();
        let contents = serde_json::to_vec(&raw).map_err(|e| {
            StorageError::corrupted(file.display().to_string(), format!("cannot serialize preferences: {e}"))
        })?;
        write_atomically(file, &contents)
    }
}

/// Record list stored under one key of a [`PreferenceStore`].
#[derive(Debug, Clone)]
pub struct PreferencesBackend {
    store: PreferenceStore,
    key: String,
}

impl PreferencesBackend {
    /// Creates a backend that stores its records under `key`.
    pub fn new(store: PreferenceStore, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    /// Returns the store this backend writes to.
    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }
}

impl Backend for PreferencesBackend {
    fn path(&self) -> &str {
        &self.key
    }

    fn raw_data(&self) -> StorageResult<Vec<Record>> {
        match self.store.get(&self.key) {
            Some(blob) => archive::decode(&self.key, blob),
            None => Ok(Vec::new()),
        }
    }

    #[instrument(skip_all, fields(key = %self.key, records = records.len()))]
    fn set_raw_data(&mut self, records: Vec<Record>) -> StorageResult<()> {
        self.store.set(&self.key, archive::encode(&self.key, &records)?)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.store.remove(&self.key)
    }
}

impl Storage for PreferencesBackend {}
