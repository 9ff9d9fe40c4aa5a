//! In-memory backend implementation.
//!
//! [`MemoryBackend`] keeps its records in a plain `Vec`. It is the reference
//! [`Backend`] implementation and the default choice for tests and for
//! storages that do not need to outlive the process.
//!
//! # Example
//!
//! ```
//! use local_storage::{JsonDecoder, JsonEncoder, MemoryBackend, Storage};
//!
//! let mut backend = MemoryBackend::new();
//! backend.append(&42u32, &JsonEncoder::new()).unwrap();
//!
//! let all: Vec<u32> = backend.all(&JsonDecoder::new()).unwrap();
//! assert_eq!(all, vec![42]);
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the backend is dropped

use crate::{
    backend::{Backend, Record},
    error::StorageResult,
    storage::Storage,
};

/// Identity reported by every [`MemoryBackend`].
pub const MEMORY_PATH: &str = "memory.storage.path";

/// In-memory record list.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    records: Vec<Record>,
}

impl MemoryBackend {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `records`.
    #[must_use]
    pub fn with_records(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl Backend for MemoryBackend {
    fn path(&self) -> &str {
        MEMORY_PATH
    }

    fn raw_data(&self) -> StorageResult<Vec<Record>> {
        Ok(self.records.clone())
    }

    fn set_raw_data(&mut self, records: Vec<Record>) -> StorageResult<()> {
        self.records = records;
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.records.clear();
        Ok(())
    }
}

impl Storage for MemoryBackend {
    fn count(&self) -> StorageResult<usize> {
        Ok(self.records.len())
    }
}
