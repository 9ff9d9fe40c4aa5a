//! Encoders and decoders between domain objects and [`Record`]s.
//!
//! Storages never choose a serialization format; every typed operation is
//! handed an [`Encoder`] or [`Decoder`] by the caller. Any closure with the
//! right signature works, and [`JsonEncoder`] / [`JsonDecoder`] cover the
//! common `serde` case.
//!
//! ```
//! use local_storage::{Decoder, Encoder, JsonDecoder, JsonEncoder};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let user = User { name: "Karl".into() };
//! let record = JsonEncoder::new().encode(&user).unwrap();
//! let decoded: User = JsonDecoder::new().decode(&record).unwrap();
//! assert_eq!(decoded, user);
//! ```

use std::{fmt, marker::PhantomData};

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::{backend::Record, error::CodecError};

/// Marker for types that can be stored and cached.
///
/// Cached snapshots are shared across threads and handed out by clone, which
/// is why every stored element type needs these bounds.
pub trait Element: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Element for T {}

/// Turns one object into one [`Record`].
pub trait Encoder<T>: Send + Sync {
    /// Encodes `object`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the object cannot be represented.
    fn encode(&self, object: &T) -> Result<Record, CodecError>;
}

/// Turns one [`Record`] back into an object.
pub trait Decoder<T>: Send + Sync {
    /// Decodes `record`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the bytes do not describe a `T`.
    fn decode(&self, record: &[u8]) -> Result<T, CodecError>;
}

impl<T, F> Encoder<T> for F
where
    F: Fn(&T) -> Result<Record, CodecError> + Send + Sync,
{
    fn encode(&self, object: &T) -> Result<Record, CodecError> {
        self(object)
    }
}

impl<T, F> Decoder<T> for F
where
    F: Fn(&[u8]) -> Result<T, CodecError> + Send + Sync,
{
    fn decode(&self, record: &[u8]) -> Result<T, CodecError> {
        self(record)
    }
}

/// Encodes objects as JSON with `serde_json`.
pub struct JsonEncoder<T> {
    _marker: PhantomData<fn(&T)>,
}

impl<T> JsonEncoder<T> {
    /// Creates a JSON encoder.
    #[must_use]
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for JsonEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonEncoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonEncoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonEncoder<{}>", std::any::type_name::<T>())
    }
}

impl<T: Serialize> Encoder<T> for JsonEncoder<T> {
    fn encode(&self, object: &T) -> Result<Record, CodecError> {
        serde_json::to_vec(object).map(Bytes::from).map_err(|e| {
            CodecError::with_source(
                format!("failed to encode {} as JSON", std::any::type_name::<T>()),
                e,
            )
        })
    }
}

/// Decodes JSON records with `serde_json`.
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    /// Creates a JSON decoder.
    #[must_use]
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonDecoder<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Decoder<T> for JsonDecoder<T> {
    fn decode(&self, record: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(record).map_err(|e| {
            CodecError::with_source(
                format!("failed to decode {} from JSON", std::any::type_name::<T>()),
                e,
            )
        })
    }
}
