//! Local record storage behind a lock-guarded manager.
//!
//! This crate stores ordered collections of encoded objects under named
//! storage identifiers. Each collection lives in a [`Backend`] (memory, a
//! shared preference store, or a file), gets its typed operations from
//! [`Storage`], can be put behind a [`CachedStorage`], and is reached through
//! a [`Manager`] that serializes access with a reader/writer lock. An
//! [`AsyncManager`] runs the same operations in the background and reports
//! through completion callbacks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      AsyncManager                           │
//! │      (tokio blocking pool, completion contexts, Weak)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        Manager                              │
//! │   Guarded<identifier → storage>, NotFound/Encoding/Decoding │
//! ├─────────────────────────────────────────────────────────────┤
//! │             AnyStorage  ·  CachedStorage                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  Storage (typed operations)                 │
//! │   append, all, first, filter, contains, remove, replace     │
//! ├──────────────┬──────────────────────┬───────────────────────┤
//! │ MemoryBackend│  PreferencesBackend  │      FileBackend      │
//! └──────────────┴──────────────────────┴───────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use local_storage::{AnyStorage, JsonDecoder, JsonEncoder, Manager};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let manager = Manager::new([("users", AnyStorage::memory().cached())]);
//! let encoder = JsonEncoder::new();
//! let decoder = JsonDecoder::new();
//!
//! manager.append("users", User { name: "Karl".into() }, &encoder).unwrap();
//! manager.append("users", User { name: "John".into() }, &encoder).unwrap();
//!
//! let last: Option<User> = manager.last("users", &decoder).unwrap();
//! assert_eq!(last.unwrap().name, "John");
//!
//! let removed = manager.remove("users", &decoder, |u: &User| u.name == "Karl").unwrap();
//! assert!(removed.is_some());
//! assert_eq!(manager.count("users").unwrap(), 1);
//! ```
//!
//! # Available Backends
//!
//! | Backend | Use Case | Persistence |
//! |---------|----------|-------------|
//! | [`MemoryBackend`] | Testing, scratch data | No |
//! | [`PreferencesBackend`] | Small collections in a key-value store | Optional JSON file |
//! | [`FileBackend`] | One collection per file | Yes |
//!
//! # Error Handling
//!
//! Storage-level calls return [`StorageResult<T>`]. The [`Manager`] surface
//! classifies every failure into a [`ManagerError`] and returns it as data;
//! nothing behind the manager's lock escapes as a panic of its own.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared test helpers (a `User` fixture,
//!   codecs, populated managers, assertion macros).

#![deny(unsafe_code)]

mod archive;
pub mod async_manager;
pub mod backend;
pub mod backend_enum;
pub mod cached;
pub mod codec;
pub mod config;
pub mod error;
pub mod file;
pub mod lock;
pub mod manager;
pub mod memory;
pub mod preferences;
pub mod storage;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

// Re-export primary types at crate root for convenience
pub use async_manager::{
    AsyncManager, AsyncManagerConfig, CompletionContext, DispatchMode, Inline, MainLoop, MainQueue, OPERATION_DROPPED,
    RuntimeContext, main_queue,
};
pub use backend::{Backend, Record};
pub use backend_enum::AnyStorage;
pub use cached::{CacheStats, CachedStorage};
pub use codec::{Decoder, Element, Encoder, JsonDecoder, JsonEncoder};
pub use config::{BackendConfig, ManagerConfig, StorageConfig};
pub use error::{
    BoxError, CodecError, ConfigError, ManagerError, ManagerResult, StorageError, StorageResult,
};
pub use file::FileBackend;
pub use lock::{Guarded, ReadWriteLock};
pub use manager::{ExclusiveManager, Manager, Registry};
pub use memory::MemoryBackend;
pub use preferences::{PreferenceStore, PreferencesBackend};
pub use storage::Storage;
