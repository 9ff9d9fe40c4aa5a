//! Error types and result aliases.
//!
//! Errors are layered the way they travel through the crate:
//!
//! - [`CodecError`] - an encoder or decoder rejected a value
//! - [`StorageError`] - any failure raised by a [`Storage`](crate::Storage) operation, passed up
//!   unclassified
//! - [`ManagerError`] - the classified outcome returned by [`Manager`](crate::Manager) and
//!   [`AsyncManager`](crate::AsyncManager): `NotFound`, `Encoding` or `Decoding`
//! - [`ConfigError`] - invalid or unreadable configuration
//!
//! # Example
//!
//! ```
//! use local_storage::{ManagerError, ManagerResult};
//!
//! fn lookup(identifier: &str) -> ManagerResult<Vec<u8>> {
//!     Err(ManagerError::not_found(identifier))
//! }
//! ```

use std::{path::PathBuf, sync::Arc};

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage-level operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for the [`Manager`](crate::Manager) surface.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Failure reported by an [`Encoder`](crate::Encoder) or [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl CodecError {
    /// Creates a codec error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    /// Creates a codec error with a message and source error.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised by storage operations and backends.
///
/// Storages do not decide whether a failure is an encoding or a decoding
/// problem; that classification happens at the [`Manager`](crate::Manager)
/// boundary, based on which operation failed.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// An encoder or decoder failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Reading or writing the physical resource failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path of the resource being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Persisted content could not be read back as a record list.
    #[error("Corrupted storage at {path}: {message}")]
    Corrupted {
        /// Identity of the corrupted resource.
        path: String,
        /// What was wrong with the content.
        message: String,
    },

    /// The storage location cannot be used.
    #[error("Invalid path {}: {message}", .path.display())]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
        /// Why the path was rejected.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Io` error for the given path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source: Arc::new(source) }
    }

    /// Creates a new `Corrupted` error.
    #[must_use]
    pub fn corrupted(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupted { path: path.into(), message: message.into() }
    }

    /// Creates a new `InvalidPath` error.
    #[must_use]
    pub fn invalid_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into(), message: message.into() }
    }
}

/// Classified outcome of a failed [`Manager`](crate::Manager) operation.
///
/// Every failure that happens behind the manager's lock is converted into one
/// of these variants and returned as data; nothing escapes as a panic.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ManagerError {
    /// The storage identifier is not registered, or the manager behind an
    /// [`AsyncManager`](crate::AsyncManager) no longer exists.
    #[error("Storage not found: {identifier}")]
    NotFound {
        /// The missing identifier, or a description of what is gone.
        identifier: String,
    },

    /// A write-side operation failed to encode or persist.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Description of the failure.
        message: String,
        /// The storage error that caused it.
        #[source]
        source: Option<BoxError>,
    },

    /// A read-side operation failed to load or decode.
    #[error("Decoding error: {message}")]
    Decoding {
        /// Description of the failure.
        message: String,
        /// The storage error that caused it.
        #[source]
        source: Option<BoxError>,
    },
}

impl ManagerError {
    /// Creates a new `NotFound` error for the given identifier.
    #[must_use]
    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound { identifier: identifier.into() }
    }

    /// Creates a new `Encoding` error with the given message.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding { message: message.into(), source: None }
    }

    /// Creates a new `Encoding` error with a message and source error.
    #[must_use]
    pub fn encoding_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Encoding { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Decoding` error with the given message.
    #[must_use]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding { message: message.into(), source: None }
    }

    /// Creates a new `Decoding` error with a message and source error.
    #[must_use]
    pub fn decoding_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Decoding { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns true for [`ManagerError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A field holds a value that cannot be used.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Name of the field.
        field: String,
        /// Why it was rejected.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration {}: {source}", .path.display())]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A storage described by the configuration could not be opened.
    #[error("failed to open storage {identifier}: {source}")]
    Storage {
        /// Identifier of the storage being opened.
        identifier: String,
        /// The underlying storage error.
        #[source]
        source: StorageError,
    },
}

impl ConfigError {
    /// Creates a new `Invalid` error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), message: message.into() }
    }
}
