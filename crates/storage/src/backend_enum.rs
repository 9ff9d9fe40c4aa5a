//! Unified storage enum.
//!
//! [`Storage`]'s typed operations are generic over the element type, so a
//! storage cannot be used as a trait object. [`AnyStorage`] closes the set
//! instead: one enum that can hold any of the crate's backends, a boxed
//! custom [`Backend`], or a cached wrapper around any of those. A manager
//! registry keyed by identifier holds `AnyStorage` values and dispatches each
//! call statically.
//!
//! # Available Variants
//!
//! | Variant | Use Case |
//! |---------|----------|
//! | [`AnyStorage::Memory`] | Tests, process-lifetime data |
//! | [`AnyStorage::Preferences`] | Small collections kept in a shared key-value store |
//! | [`AnyStorage::File`] | One archive file per collection |
//! | [`AnyStorage::Custom`] | Any other [`Backend`] implementation |
//! | [`AnyStorage::Cached`] | Any of the above behind a decoded-snapshot cache |
//!
//! # Usage
//!
//! ```
//! use local_storage::{AnyStorage, JsonDecoder, JsonEncoder, Storage};
//!
//! let mut storage = AnyStorage::memory().cached();
//! storage.append(&7u32, &JsonEncoder::new()).unwrap();
//!
//! let all: Vec<u32> = storage.all(&JsonDecoder::new()).unwrap();
//! assert_eq!(all, vec![7]);
//! assert!(storage.is_cached());
//! ```

use std::{fmt, path::Path};

use crate::{
    backend::{Backend, Record},
    cached::CachedStorage,
    codec::{Decoder, Element, Encoder},
    error::StorageResult,
    file::FileBackend,
    memory::MemoryBackend,
    preferences::{PreferenceStore, PreferencesBackend},
    storage::Storage,
};

/// Runs `$body` with `$storage` bound to the variant's inner value.
macro_rules! dispatch {
    ($value:expr, $storage:ident => $body:expr) => {
        match $value {
            AnyStorage::Memory($storage) => $body,
            AnyStorage::Preferences($storage) => $body,
            AnyStorage::File($storage) => $body,
            AnyStorage::Custom($storage) => $body,
            AnyStorage::Cached($storage) => $body,
        }
    };
}

/// Any storage the crate knows how to hold in a registry.
#[non_exhaustive]
pub enum AnyStorage {
    /// In-memory records.
    Memory(MemoryBackend),
    /// Records under one key of a [`PreferenceStore`].
    Preferences(PreferencesBackend),
    /// Records in a single archive file.
    File(FileBackend),
    /// A caller-provided backend.
    Custom(Box<dyn Backend>),
    /// Another storage behind a decoded-snapshot cache.
    Cached(Box<CachedStorage<AnyStorage>>),
}

impl AnyStorage {
    /// Creates an empty in-memory storage.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryBackend::new())
    }

    /// Creates a storage kept under `key` in `store`.
    pub fn preferences(store: PreferenceStore, key: impl Into<String>) -> Self {
        Self::Preferences(PreferencesBackend::new(store, key))
    }

    /// Opens a file storage below `directory`.
    ///
    /// # Errors
    ///
    /// See [`FileBackend::open`].
    pub fn file(directory: impl AsRef<Path>, relative_path: impl AsRef<Path>) -> StorageResult<Self> {
        FileBackend::open(directory, relative_path).map(Self::File)
    }

    /// Wraps a caller-provided backend.
    pub fn custom(backend: impl Backend + 'static) -> Self {
        Self::Custom(Box::new(backend))
    }

    /// Puts this storage behind a cache. Already cached storages are returned as-is.
    #[must_use]
    pub fn cached(self) -> Self {
        match self {
            Self::Cached(_) => self,
            other => Self::Cached(Box::new(CachedStorage::new(other))),
        }
    }

    /// Returns true if this storage is behind a cache.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    /// Returns the cache wrapper, if any.
    #[must_use]
    pub fn as_cached(&self) -> Option<&CachedStorage<AnyStorage>> {
        match self {
            Self::Cached(cached) => Some(cached.as_ref()),
            _ => None,
        }
    }

    /// Short name of the variant, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Preferences(_) => "preferences",
            Self::File(_) => "file",
            Self::Custom(_) => "custom",
            Self::Cached(_) => "cached",
        }
    }
}

impl Backend for AnyStorage {
    fn path(&self) -> &str {
        dispatch!(self, storage => storage.path())
    }

    fn raw_data(&self) -> StorageResult<Vec<Record>> {
        dispatch!(self, storage => storage.raw_data())
    }

    fn set_raw_data(&mut self, records: Vec<Record>) -> StorageResult<()> {
        dispatch!(self, storage => storage.set_raw_data(records))
    }

    fn clear(&mut self) -> StorageResult<()> {
        dispatch!(self, storage => storage.clear())
    }
}

impl Storage for AnyStorage {
    fn count(&self) -> StorageResult<usize> {
        dispatch!(self, storage => storage.count())
    }

    fn append<T, E>(&mut self, object: &T, encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        dispatch!(self, storage => storage.append(object, encoder))
    }

    fn append_all<T, E>(&mut self, objects: &[T], encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        dispatch!(self, storage => storage.append_all(objects, encoder))
    }

    fn all<T, D>(&self, decoder: &D) -> StorageResult<Vec<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        dispatch!(self, storage => storage.all(decoder))
    }

    fn remove<T, D, P>(&mut self, decoder: &D, predicate: P) -> StorageResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        dispatch!(self, storage => storage.remove(decoder, predicate))
    }

    fn replace_all<T, E>(&mut self, objects: &[T], encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        dispatch!(self, storage => storage.replace_all(objects, encoder))
    }
}

impl From<MemoryBackend> for AnyStorage {
    fn from(backend: MemoryBackend) -> Self {
        Self::Memory(backend)
    }
}

impl From<PreferencesBackend> for AnyStorage {
    fn from(backend: PreferencesBackend) -> Self {
        Self::Preferences(backend)
    }
}

impl From<FileBackend> for AnyStorage {
    fn from(backend: FileBackend) -> Self {
        Self::File(backend)
    }
}

impl From<Box<dyn Backend>> for AnyStorage {
    fn from(backend: Box<dyn Backend>) -> Self {
        Self::Custom(backend)
    }
}

impl From<CachedStorage<AnyStorage>> for AnyStorage {
    fn from(cached: CachedStorage<AnyStorage>) -> Self {
        Self::Cached(Box::new(cached))
    }
}

impl fmt::Debug for AnyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(_) => write!(f, "AnyStorage::Memory"),
            Self::Preferences(b) => write!(f, "AnyStorage::Preferences({})", b.path()),
            Self::File(b) => write!(f, "AnyStorage::File({})", b.path()),
            Self::Custom(b) => write!(f, "AnyStorage::Custom({})", b.path()),
            Self::Cached(c) => write!(f, "AnyStorage::Cached({:?})", c.inner()),
        }
    }
}
