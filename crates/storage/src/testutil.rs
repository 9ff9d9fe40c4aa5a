//! Shared fixtures for storage and manager tests.
//!
//! This module provides a small serializable `User` fixture, codecs for it
//! (working and always-failing), pre-populated managers and assertion macros
//! for [`ManagerResult`] values. It is feature-gated behind `testutil` to
//! prevent leaking into production builds.
//!
//! # Usage
//!
//! In downstream tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! local-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use local_storage::testutil::{User, populated_manager, user_decoder};
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    backend::Record,
    backend_enum::AnyStorage,
    codec::{Decoder, Encoder, JsonDecoder, JsonEncoder},
    error::CodecError,
    manager::Manager,
};

/// Minimal domain object used throughout the tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Display name.
    pub name: String,
}

impl User {
    /// Creates a user called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Creates `count` users named `"user-0"`, `"user-1"`, ...
#[must_use]
pub fn users(count: usize) -> Vec<User> {
    (0..count).map(|i| User::new(format!("user-{i}"))).collect()
}

/// JSON encoder for [`User`].
#[must_use]
pub fn user_encoder() -> JsonEncoder<User> {
    JsonEncoder::new()
}

/// JSON decoder for [`User`].
#[must_use]
pub fn user_decoder() -> JsonDecoder<User> {
    JsonDecoder::new()
}

/// Encoder that rejects every object.
pub fn failing_encoder() -> impl Encoder<User> {
    |_: &User| -> Result<Record, CodecError> { Err(CodecError::new("encoder always fails")) }
}

/// Decoder that rejects every record.
pub fn failing_decoder() -> impl Decoder<User> {
    |_: &[u8]| -> Result<User, CodecError> { Err(CodecError::new("decoder always fails")) }
}

/// Create a [`Manager`] with one in-memory storage holding `count` users.
///
/// # Panics
///
/// Panics if the users cannot be appended (should not happen with memory storage).
pub fn populated_manager(identifier: &str, count: usize) -> Manager {
    let manager = Manager::new([(identifier, AnyStorage::memory())]);
    manager.append_all(identifier, users(count), &user_encoder()).expect("populate append_all failed");
    manager
}

/// Assert that a [`ManagerResult`] is a [`ManagerError::NotFound`], optionally
/// for a specific identifier.
///
/// [`ManagerResult`]: crate::ManagerResult
/// [`ManagerError::NotFound`]: crate::ManagerError::NotFound
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use local_storage::{ManagerError, ManagerResult, assert_not_found};
///
/// let result: ManagerResult<()> = Err(ManagerError::not_found("missing"));
/// assert_not_found!(result, "missing");
/// ```
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        match $result {
            Err($crate::error::ManagerError::NotFound { .. }) => {},
            other => panic!("expected ManagerError::NotFound, got: {other:?}"),
        }
    };
    ($result:expr, $identifier:expr) => {
        match $result {
            Err($crate::error::ManagerError::NotFound { identifier }) => {
                assert_eq!(identifier.as_str(), $identifier, "unexpected NotFound identifier")
            },
            other => panic!("expected ManagerError::NotFound, got: {other:?}"),
        }
    };
}

/// Assert that a [`ManagerResult`](crate::ManagerResult) is a
/// [`ManagerError::Encoding`](crate::ManagerError::Encoding).
#[macro_export]
macro_rules! assert_encoding {
    ($result:expr) => {
        match $result {
            Err($crate::error::ManagerError::Encoding { .. }) => {},
            other => panic!("expected ManagerError::Encoding, got: {other:?}"),
        }
    };
}

/// Assert that a [`ManagerResult`](crate::ManagerResult) is a
/// [`ManagerError::Decoding`](crate::ManagerError::Decoding).
#[macro_export]
macro_rules! assert_decoding {
    ($result:expr) => {
        match $result {
            Err($crate::error::ManagerError::Decoding { .. }) => {},
            other => panic!("expected ManagerError::Decoding, got: {other:?}"),
        }
    };
}

/// Assert that a [`ManagerResult`](crate::ManagerResult) is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
#[macro_export]
macro_rules! assert_manager_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got ManagerError: {e:?}"),
        }
    };
}
