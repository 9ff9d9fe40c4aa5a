//! Lock-guarded registry of named storages.
//!
//! A [`Manager`] owns a fixed set of storages keyed by identifier, all behind
//! one [`Guarded`] registry. Each public operation takes the registry lock
//! once, looks the storage up and runs exactly one [`Storage`] operation on
//! it:
//!
//! ```text
//!  caller ──► Manager::append("users", …)
//!               │
//!               ├─ registry.write(|storages| …)      exclusive
//!               │     └─ storages["users"].append(…)
//!               │
//!               └─ StorageError ──► ManagerError::Encoding
//!
//!  caller ──► Manager::all("users", …)
//!               │
//!               ├─ registry.read(|storages| …)       shared
//!               │     └─ storages["users"].all(…)
//!               │
//!               └─ StorageError ──► ManagerError::Decoding
//! ```
//!
//! The lock is registry-wide: a write to one storage blocks reads of every
//! other storage for its duration.
//!
//! # Error Classification
//!
//! | Operation | Lock | Failure |
//! |-----------|------|---------|
//! | `append`, `append_all`, `replace_all`, `clear` | write | [`ManagerError::Encoding`] |
//! | `remove` | write | [`ManagerError::Decoding`] |
//! | `all`, `first`, `first_where`, `filter`, `contains`, `last`, `count` | read | [`ManagerError::Decoding`] |
//!
//! An unknown identifier always yields [`ManagerError::NotFound`] without
//! touching any storage.
//!
//! # Example
//!
//! ```
//! use local_storage::{AnyStorage, JsonDecoder, JsonEncoder, Manager};
//!
//! let manager = Manager::new([("users", AnyStorage::memory())]);
//! manager.append("users", "Karl".to_owned(), &JsonEncoder::new()).unwrap();
//!
//! let users: Vec<String> = manager.all("users", &JsonDecoder::new()).unwrap();
//! assert_eq!(users, vec!["Karl".to_owned()]);
//!
//! let missing = manager.all::<String, _>("missing", &JsonDecoder::new()).unwrap_err();
//! assert!(missing.is_not_found());
//! ```

use std::{collections::HashMap, fmt};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::{
    backend_enum::AnyStorage,
    codec::{Decoder, Element, Encoder},
    error::{ManagerError, ManagerResult, StorageError, StorageResult},
    lock::{Guarded, ReadWriteLock},
    storage::Storage,
};

/// Storages keyed by identifier.
pub type Registry<S = AnyStorage> = HashMap<String, S>;

/// A [`Manager`] whose reads are exclusive too.
pub type ExclusiveManager<S = AnyStorage> = Manager<S, Mutex<Registry<S>>>;

fn encoding(message: &str) -> impl FnOnce(StorageError) -> ManagerError + '_ {
    move |e| ManagerError::encoding_with_source(format!("{message}: {e}"), e)
}

fn decoding(message: &str) -> impl FnOnce(StorageError) -> ManagerError + '_ {
    move |e| ManagerError::decoding_with_source(format!("{message}: {e}"), e)
}

/// Thread-safe access to a fixed set of named storages.
///
/// `L` selects the lock guarding the registry: the default
/// [`RwLock`](parking_lot::RwLock) lets reads run concurrently, while
/// [`ExclusiveManager`] serializes everything.
pub struct Manager<S = AnyStorage, L = RwLock<Registry<S>>> {
    registry: Guarded<Registry<S>, L>,
}

impl<S: Storage> Manager<S> {
    /// Creates a manager owning `storages`, with concurrent reads.
    ///
    /// The set of identifiers is fixed from here on. A later entry with the
    /// same identifier replaces an earlier one.
    pub fn new<I, K>(storages: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
    {
        Self::with_registry(storages.into_iter().map(|(identifier, storage)| (identifier.into(), storage)).collect())
    }
}

impl<S: Storage> ExclusiveManager<S> {
    /// Creates a manager owning `storages` whose reads are exclusive too.
    pub fn exclusive<I, K>(storages: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
    {
        Self::with_registry(storages.into_iter().map(|(identifier, storage)| (identifier.into(), storage)).collect())
    }
}

impl<S, L> Manager<S, L>
where
    S: Storage,
    L: ReadWriteLock<Registry<S>>,
{
    /// Creates a manager owning `registry`, guarded by a lock of type `L`.
    pub fn with_registry(registry: Registry<S>) -> Self {
        debug!(storages = registry.len(), "created storage manager");
        Self { registry: Guarded::new(registry) }
    }

    /// Returns the registered identifiers in sorted order.
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers = self.registry.read(|storages| storages.keys().cloned().collect::<Vec<_>>());
        identifiers.sort_unstable();
        identifiers
    }

    /// Returns whether `identifier` is registered.
    pub fn has_storage(&self, identifier: &str) -> bool {
        self.registry.read(|storages| storages.contains_key(identifier))
    }

    /// Runs `task` on the named storage under shared access.
    fn read<R>(
        &self,
        identifier: &str,
        task: impl FnOnce(&S) -> StorageResult<R>,
        on_error: impl FnOnce(StorageError) -> ManagerError,
    ) -> ManagerResult<R> {
        self.registry.read(|storages| {
            let Some(storage) = storages.get(identifier) else {
                debug!(storage = identifier, "storage not found");
                return Err(ManagerError::not_found(identifier));
            };
            task(storage).map_err(|e| {
                let err = on_error(e);
                debug!(storage = identifier, error = %err, "storage read failed");
                err
            })
        })
    }

    /// Runs `task` on the named storage under exclusive access.
    fn write<R>(
        &self,
        identifier: &str,
        task: impl FnOnce(&mut S) -> StorageResult<R>,
        on_error: impl FnOnce(StorageError) -> ManagerError,
    ) -> ManagerResult<R> {
        self.registry.write(|storages| {
            let Some(storage) = storages.get_mut(identifier) else {
                debug!(storage = identifier, "storage not found");
                return Err(ManagerError::not_found(identifier));
            };
            task(storage).map_err(|e| {
                let err = on_error(e);
                debug!(storage = identifier, error = %err, "storage write failed");
                err
            })
        })
    }

    /// Appends `object` to the named storage and hands it back.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] for an unknown identifier, [`ManagerError::Encoding`] if the
    /// object cannot be encoded or persisted.
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn append<T, E>(&self, identifier: &str, object: T, encoder: &E) -> ManagerResult<T>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        self.write(
            identifier,
            |storage| storage.append(&object, encoder),
            encoding("Error trying to save data to storage"),
        )?;
        Ok(object)
    }

    /// Appends `objects` in order and hands them back.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] for an unknown identifier, [`ManagerError::Encoding`] if any
    /// object cannot be encoded; nothing is appended in that case.
    #[tracing::instrument(skip_all, fields(storage = identifier, count = objects.len()))]
    pub fn append_all<T, E>(&self, identifier: &str, objects: Vec<T>, encoder: &E) -> ManagerResult<Vec<T>>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        self.write(
            identifier,
            |storage| storage.append_all(&objects, encoder),
            encoding("Error trying to save data to storage"),
        )?;
        Ok(objects)
    }

    /// Decodes every object of the named storage.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] for an unknown identifier, [`ManagerError::Decoding`] if any
    /// record cannot be read or decoded.
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn all<T, D>(&self, identifier: &str, decoder: &D) -> ManagerResult<Vec<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        self.read(identifier, |storage| storage.all(decoder), decoding("Error trying to load data from storage"))
    }

    /// Returns the first object of the named storage.
    ///
    /// # Errors
    ///
    /// See [`all`](Self::all).
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn first<T, D>(&self, identifier: &str, decoder: &D) -> ManagerResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        self.read(identifier, |storage| storage.first(decoder), decoding("Error trying to load first from storage"))
    }

    /// Returns the first object of the named storage matching `predicate`.
    ///
    /// # Errors
    ///
    /// See [`all`](Self::all).
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn first_where<T, D, P>(&self, identifier: &str, decoder: &D, predicate: P) -> ManagerResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        self.read(
            identifier,
            |storage| storage.first_where(decoder, predicate),
            decoding("Error trying to load first from storage"),
        )
    }

    /// Returns every object of the named storage matching `predicate`.
    ///
    /// # Errors
    ///
    /// See [`all`](Self::all).
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn filter<T, D, P>(&self, identifier: &str, decoder: &D, predicate: P) -> ManagerResult<Vec<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        self.read(
            identifier,
            |storage| storage.filter(decoder, predicate),
            decoding("Error trying to filter data from storage"),
        )
    }

    /// Returns whether any object of the named storage matches `predicate`.
    ///
    /// # Errors
    ///
    /// See [`all`](Self::all).
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn contains<T, D, P>(&self, identifier: &str, decoder: &D, predicate: P) -> ManagerResult<bool>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        self.read(
            identifier,
            |storage| storage.contains(decoder, predicate),
            decoding("Error trying to load data from storage"),
        )
    }

    /// Returns the last object of the named storage.
    ///
    /// # Errors
    ///
    /// See [`all`](Self::all).
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn last<T, D>(&self, identifier: &str, decoder: &D) -> ManagerResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        self.read(identifier, |storage| storage.last(decoder), decoding("Error trying to load data from storage"))
    }

    /// Returns the number of records in the named storage.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] for an unknown identifier, [`ManagerError::Decoding`] if the
    /// records cannot be read.
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn count(&self, identifier: &str) -> ManagerResult<usize> {
        self.read(identifier, |storage| storage.count(), decoding("Error trying to load data from storage"))
    }

    /// Removes and returns the first object of the named storage matching `predicate`.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] for an unknown identifier, [`ManagerError::Decoding`] if the
    /// records cannot be decoded or the shortened list cannot be written.
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn remove<T, D, P>(&self, identifier: &str, decoder: &D, predicate: P) -> ManagerResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        self.write(
            identifier,
            |storage| storage.remove(decoder, predicate),
            decoding("Error trying to load data from storage"),
        )
    }

    /// Replaces the content of the named storage with `objects` and hands them back.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] for an unknown identifier, [`ManagerError::Encoding`] if any
    /// object cannot be encoded; the previous content is kept in that case.
    #[tracing::instrument(skip_all, fields(storage = identifier, count = objects.len()))]
    pub fn replace_all<T, E>(&self, identifier: &str, objects: Vec<T>, encoder: &E) -> ManagerResult<Vec<T>>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        self.write(
            identifier,
            |storage| storage.replace_all(&objects, encoder),
            encoding("Error trying to replace data from storage"),
        )?;
        Ok(objects)
    }

    /// Removes every record from the named storage.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] for an unknown identifier, [`ManagerError::Encoding`] if the
    /// storage cannot be written.
    #[tracing::instrument(skip_all, fields(storage = identifier))]
    pub fn clear(&self, identifier: &str) -> ManagerResult<bool> {
        self.write(identifier, |storage| storage.clear().map(|()| true), encoding("Error trying to clear storage"))
    }
}

impl<S, L> FromIterator<(String, S)> for Manager<S, L>
where
    S: Storage,
    L: ReadWriteLock<Registry<S>>,
{
    fn from_iter<I: IntoIterator<Item = (String, S)>>(iter: I) -> Self {
        Self::with_registry(iter.into_iter().collect())
    }
}

impl<S, L> fmt::Debug for Manager<S, L>
where
    S: Storage,
    L: ReadWriteLock<Registry<S>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager").field("identifiers", &self.identifiers()).finish()
    }
}
