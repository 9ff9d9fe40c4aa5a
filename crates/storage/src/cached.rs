//! Decoded-snapshot cache wrapper for storages.
//!
//! [`CachedStorage`] wraps any [`Storage`] and keeps the last decoded view of
//! its records so repeated reads skip the decode pass. The snapshot is tagged
//! with the element type it was decoded as; a read for a different type never
//! sees it and decodes from the wrapped storage instead.
//!
//! # Design
//!
//! - **Read-through**: `all` serves the snapshot when it holds the requested element type,
//!   otherwise decodes from the inner storage and keeps the result. Every other read (`first`,
//!   `filter`, `last`, ...) goes through `all`.
//! - **Write-then-update**: `append`, `append_all` and `replace_all` commit to the inner storage
//!   first and only then apply the same change to the snapshot. A failed write leaves the snapshot
//!   as it was.
//! - **Index-aligned removal**: `remove` finds the index through the snapshot and drops that same
//!   index from the stored records, so nothing is decoded twice. A snapshot whose length no longer
//!   matches the stored records is dropped and the removal falls back to the wrapped storage.
//! - **Absent, not empty**: `clear` and raw writes through `set_raw_data` drop the snapshot so the
//!   next read reloads from the inner storage.
//!
//! # Usage
//!
//! ```
//! use local_storage::{CachedStorage, JsonDecoder, JsonEncoder, MemoryBackend, Storage};
//!
//! let mut cached = CachedStorage::new(MemoryBackend::new());
//! cached.append(&"Karl".to_owned(), &JsonEncoder::new()).unwrap();
//!
//! let first: Vec<String> = cached.all(&JsonDecoder::new()).unwrap(); // miss, populates
//! let again: Vec<String> = cached.all(&JsonDecoder::new()).unwrap(); // hit
//! assert_eq!(first, again);
//! assert_eq!(cached.cache_stats().hits, 1);
//! ```

use std::{
    any::{Any, type_name},
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    backend::{Backend, Record},
    codec::{Decoder, Element, Encoder},
    error::StorageResult,
    storage::Storage,
};

/// Decoded records of one element type.
struct Snapshot {
    elements: Box<dyn Any + Send + Sync>,
    element_type: &'static str,
    len: usize,
}

impl Snapshot {
    fn new<T: Element>(elements: Vec<T>) -> Self {
        let len = elements.len();
        Self { elements: Box::new(elements), element_type: type_name::<T>(), len }
    }

    fn get<T: Element>(&self) -> Option<&Vec<T>> {
        self.elements.downcast_ref::<Vec<T>>()
    }

    /// Applies `update` if the snapshot holds `T`. Returns false otherwise.
    fn update<T: Element>(&mut self, update: impl FnOnce(&mut Vec<T>)) -> bool {
        let Some(elements) = self.elements.downcast_mut::<Vec<T>>() else {
            return false;
        };
        update(elements);
        self.len = elements.len();
        true
    }
}

/// Hit and miss counters of a [`CachedStorage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from the snapshot.
    pub hits: u64,
    /// Reads that had to decode from the wrapped storage.
    pub misses: u64,
}

/// Storage wrapper that caches the decoded record list.
///
/// Reads take `&self`, so the snapshot sits behind its own mutex; the manager
/// only holds a shared lock on its registry while reading.
pub struct CachedStorage<S> {
    inner: S,
    snapshot: Mutex<Option<Snapshot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: Storage> CachedStorage<S> {
    /// Wraps `inner` with an initially absent snapshot.
    pub fn new(inner: S) -> Self {
        Self { inner, snapshot: Mutex::new(None), hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    /// Returns a reference to the wrapped storage.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwraps the decorator, dropping the snapshot.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Returns whether a snapshot is currently held.
    pub fn is_cached(&self) -> bool {
        self.snapshot.lock().is_some()
    }

    /// Returns the hit and miss counters.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed) }
    }

    /// Drops the snapshot; the next read decodes from the wrapped storage.
    pub fn invalidate(&self) {
        self.snapshot.lock().take();
    }

    /// Applies `update` to a snapshot of `T`, dropping a snapshot of any other type.
    fn update_snapshot<T: Element>(&mut self, update: impl FnOnce(&mut Vec<T>)) {
        let slot = self.snapshot.get_mut();
        let Some(snapshot) = slot.as_mut() else {
            return;
        };
        if snapshot.update(update) {
            trace!(path = self.inner.path(), len = snapshot.len, "cache updated");
        } else {
            trace!(path = self.inner.path(), cached = snapshot.element_type, "cache holds another type, invalidated");
            *slot = None;
        }
    }
}

impl<S: Storage> Backend for CachedStorage<S> {
    fn path(&self) -> &str {
        self.inner.path()
    }

    fn raw_data(&self) -> StorageResult<Vec<Record>> {
        self.inner.raw_data()
    }

    fn set_raw_data(&mut self, records: Vec<Record>) -> StorageResult<()> {
        self.snapshot.get_mut().take();
        self.inner.set_raw_data(records)
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.snapshot.get_mut().take();
        self.inner.clear()
    }
}

impl<S: Storage> Storage for CachedStorage<S> {
    fn count(&self) -> StorageResult<usize> {
        if let Some(snapshot) = self.snapshot.lock().as_ref() {
            return Ok(snapshot.len);
        }
        self.inner.count()
    }

    fn append<T, E>(&mut self, object: &T, encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        self.inner.append(object, encoder)?;
        self.update_snapshot(|elements: &mut Vec<T>| elements.push(object.clone()));
        Ok(())
    }

    fn append_all<T, E>(&mut self, objects: &[T], encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        self.inner.append_all(objects, encoder)?;
        self.update_snapshot(|elements: &mut Vec<T>| elements.extend_from_slice(objects));
        Ok(())
    }

    fn all<T, D>(&self, decoder: &D) -> StorageResult<Vec<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        let mut slot = self.snapshot.lock();
        if let Some(elements) = slot.as_ref().and_then(Snapshot::get::<T>) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(path = self.inner.path(), len = elements.len(), "cache hit");
            return Ok(elements.clone());
        }

        let elements = self.inner.all(decoder)?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(path = self.inner.path(), len = elements.len(), "cache miss, populated");
        *slot = Some(Snapshot::new(elements.clone()));
        Ok(elements)
    }

    fn remove<T, D, P>(&mut self, decoder: &D, predicate: P) -> StorageResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        let mut elements = self.all(decoder)?;
        let Some(index) = elements.iter().position(|object| predicate(object)) else {
            return Ok(None);
        };

        let mut records = self.inner.raw_data()?;
        if records.len() != elements.len() {
            trace!(
                path = self.inner.path(),
                cached = elements.len(),
                stored = records.len(),
                "cache stale, invalidated"
            );
            self.snapshot.get_mut().take();
            return self.inner.remove(decoder, predicate);
        }

        // Record and snapshot drop the same index.
        records.remove(index);
        self.inner.set_raw_data(records)?;
        let removed = elements.remove(index);
        trace!(path = self.inner.path(), len = elements.len(), "cache updated");
        *self.snapshot.get_mut() = Some(Snapshot::new(elements));
        Ok(Some(removed))
    }

    fn replace_all<T, E>(&mut self, objects: &[T], encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        self.inner.replace_all(objects, encoder)?;
        *self.snapshot.get_mut() = Some(Snapshot::new(objects.to_vec()));
        trace!(path = self.inner.path(), len = objects.len(), "cache replaced");
        Ok(())
    }
}

impl<S: fmt::Debug> fmt::Debug for CachedStorage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.snapshot.lock().as_ref().map(|snapshot| snapshot.element_type);
        f.debug_struct("CachedStorage")
            .field("inner", &self.inner)
            .field("cached", &cached)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
