//! Backend trait definition.
//!
//! This module defines the [`Backend`] trait, the raw-record contract every
//! persistence medium implements. A backend only knows how to hand out and
//! replace its ordered list of [`Record`]s; everything typed (appending
//! objects, decoding, filtering, removal) is derived from those two calls in
//! [`Storage`](crate::Storage).
//!
//! # Design Philosophy
//!
//! - **Records are bytes**: No assumptions about serialization format
//! - **Order is significant**: `raw_data` returns records in append order, and that order survives
//!   every mutation and reload
//! - **Whole-list replacement**: `set_raw_data` replaces the persisted list atomically; a partially
//!   written list is never observable
//! - **Synchronous**: Backends are called inside the manager's lock, so they block for at most one
//!   read or write of their medium
//!
//! # Implementing a Backend
//!
//! 1. Implement [`Backend`] (`path`, `raw_data`, `set_raw_data`, optionally `clear`)
//! 2. Add an empty `impl Storage for YourBackend {}` to get the typed operations
//! 3. Map medium-specific errors to [`StorageError`](crate::StorageError)
//!
//! See [`MemoryBackend`](crate::MemoryBackend) for a reference implementation.

use bytes::Bytes;

use crate::error::StorageResult;

/// One encoded object as stored by a backend.
pub type Record = Bytes;

/// Raw persistence contract for an ordered list of [`Record`]s.
///
/// # Key Operations
///
/// | Method | Description |
/// |--------|-------------|
/// | [`path`](Backend::path) | Opaque identity of the physical resource |
/// | [`raw_data`](Backend::raw_data) | Current records in append order |
/// | [`set_raw_data`](Backend::set_raw_data) | Atomically replace all records |
/// | [`clear`](Backend::clear) | Drop all records, possibly releasing the resource |
pub trait Backend: Send + Sync {
    /// Returns an opaque string identifying the physical resource.
    fn path(&self) -> &str;

    /// Returns the persisted records in append order.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::StorageError) if the medium cannot be read or its
    /// content is not a record list.
    fn raw_data(&self) -> StorageResult<Vec<Record>>;

    /// Replaces the persisted records with `records`.
    ///
    /// After a successful return, `raw_data` observes exactly `records`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::StorageError) if the medium cannot be written; the
    /// previous content is then left in place.
    fn set_raw_data(&mut self, records: Vec<Record>) -> StorageResult<()>;

    /// Removes every record.
    ///
    /// Backends may release the underlying resource here (delete a key or a
    /// file); the only requirement is that `raw_data` returns an empty list
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::StorageError) if the medium cannot be written.
    fn clear(&mut self) -> StorageResult<()> {
        self.set_raw_data(Vec::new())
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn path(&self) -> &str {
        (**self).path()
    }

    fn raw_data(&self) -> StorageResult<Vec<Record>> {
        (**self).raw_data()
    }

    fn set_raw_data(&mut self, records: Vec<Record>) -> StorageResult<()> {
        (**self).set_raw_data(records)
    }

    fn clear(&mut self) -> StorageResult<()> {
        (**self).clear()
    }
}
