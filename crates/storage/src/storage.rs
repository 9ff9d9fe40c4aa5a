//! Typed operations derived from a [`Backend`]'s raw records.
//!
//! [`Storage`] turns the two raw calls of a backend (`raw_data` and
//! `set_raw_data`) into the collection API callers use: append, decode all,
//! query, remove by predicate, replace and clear. Every method has a default
//! implementation; concrete backends opt in with an empty impl block and
//! decorators such as [`CachedStorage`](crate::CachedStorage) override the
//! methods they need to intercept.
//!
//! # Failure Semantics
//!
//! Every mutation computes the complete new record list before calling
//! `set_raw_data`, so a failing encoder or decoder leaves the stored records
//! untouched. Failures are returned as [`StorageError`] without
//! classification.
//!
//! # Example
//!
//! ```
//! use local_storage::{JsonDecoder, JsonEncoder, MemoryBackend, Storage};
//!
//! let mut storage = MemoryBackend::new();
//! storage.append(&"Karl".to_owned(), &JsonEncoder::new()).unwrap();
//! storage.append(&"John".to_owned(), &JsonEncoder::new()).unwrap();
//!
//! let last: Option<String> = storage.last(&JsonDecoder::new()).unwrap();
//! assert_eq!(last.as_deref(), Some("John"));
//! ```

use crate::{
    backend::{Backend, Record},
    codec::{Decoder, Element, Encoder},
    error::{StorageError, StorageResult},
};

/// Decodes `records` in order, stopping at the first failure.
pub(crate) fn decode_records<T, D>(records: &[Record], decoder: &D) -> StorageResult<Vec<T>>
where
    D: Decoder<T> + ?Sized,
{
    records.iter().map(|record| decoder.decode(record).map_err(StorageError::from)).collect()
}

/// Encodes `objects` in order, stopping at the first failure.
pub(crate) fn encode_objects<T, E>(objects: &[T], encoder: &E) -> StorageResult<Vec<Record>>
where
    E: Encoder<T> + ?Sized,
{
    objects.iter().map(|object| encoder.encode(object).map_err(StorageError::from)).collect()
}

/// A logical collection of objects stored as an ordered list of records.
///
/// The element type `T` is chosen per call through the encoder or decoder;
/// nothing about it is stored.
pub trait Storage: Backend {
    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the records cannot be read.
    fn count(&self) -> StorageResult<usize> {
        Ok(self.raw_data()?.len())
    }

    /// Encodes `object` and appends its record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Codec`] if encoding fails, or a backend error;
    /// the stored records are unchanged in both cases.
    fn append<T, E>(&mut self, object: &T, encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        let record = encoder.encode(object)?;
        let mut records = self.raw_data()?;
        records.push(record);
        self.set_raw_data(records)
    }

    /// Encodes every object in order and appends all records in one write.
    ///
    /// # Errors
    ///
    /// Fails on the first object that cannot be encoded; nothing is appended.
    fn append_all<T, E>(&mut self, objects: &[T], encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        let encoded = encode_objects(objects, encoder)?;
        let mut records = self.raw_data()?;
        records.extend(encoded);
        self.set_raw_data(records)
    }

    /// Decodes every record in storage order.
    ///
    /// # Errors
    ///
    /// Fails on the first record that cannot be decoded.
    fn all<T, D>(&self, decoder: &D) -> StorageResult<Vec<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        decode_records(&self.raw_data()?, decoder)
    }

    /// Returns the earliest stored object, if any.
    ///
    /// # Errors
    ///
    /// See [`all`](Storage::all).
    fn first<T, D>(&self, decoder: &D) -> StorageResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        Ok(self.all(decoder)?.into_iter().next())
    }

    /// Returns the earliest stored object matching `predicate`, if any.
    ///
    /// # Errors
    ///
    /// See [`all`](Storage::all).
    fn first_where<T, D, P>(&self, decoder: &D, predicate: P) -> StorageResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        Ok(self.all(decoder)?.into_iter().find(|object| predicate(object)))
    }

    /// Returns every stored object matching `predicate`, in storage order.
    ///
    /// # Errors
    ///
    /// See [`all`](Storage::all).
    fn filter<T, D, P>(&self, decoder: &D, predicate: P) -> StorageResult<Vec<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        Ok(self.all(decoder)?.into_iter().filter(|object| predicate(object)).collect())
    }

    /// Returns whether any stored object matches `predicate`.
    ///
    /// # Errors
    ///
    /// See [`all`](Storage::all).
    fn contains<T, D, P>(&self, decoder: &D, predicate: P) -> StorageResult<bool>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        Ok(self.all(decoder)?.iter().any(predicate))
    }

    /// Returns the most recently appended object, if any.
    ///
    /// # Errors
    ///
    /// See [`all`](Storage::all).
    fn last<T, D>(&self, decoder: &D) -> StorageResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
    {
        Ok(self.all(decoder)?.pop())
    }

    /// Removes the earliest object matching `predicate` and returns it.
    ///
    /// The stored record at the matching index is dropped as-is; nothing is
    /// re-encoded. Returns `Ok(None)` and leaves the storage untouched when no
    /// object matches.
    ///
    /// # Errors
    ///
    /// Fails if any record cannot be decoded, or if the shortened list cannot
    /// be written.
    fn remove<T, D, P>(&mut self, decoder: &D, predicate: P) -> StorageResult<Option<T>>
    where
        T: Element,
        D: Decoder<T> + ?Sized,
        P: Fn(&T) -> bool,
    {
        let mut records = self.raw_data()?;
        let mut objects = decode_records(&records, decoder)?;

        let Some(index) = objects.iter().position(|object| predicate(object)) else {
            return Ok(None);
        };

        records.remove(index);
        self.set_raw_data(records)?;
        Ok(Some(objects.remove(index)))
    }

    /// Replaces the stored records with the encoded `objects`.
    ///
    /// # Errors
    ///
    /// Fails on the first object that cannot be encoded; the previous records
    /// are kept in that case.
    fn replace_all<T, E>(&mut self, objects: &[T], encoder: &E) -> StorageResult<()>
    where
        T: Element,
        E: Encoder<T> + ?Sized,
    {
        let encoded = encode_objects(objects, encoder)?;
        self.set_raw_data(encoded)
    }
}

impl Storage for Box<dyn Backend> {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::{
        MemoryBackend,
        error::CodecError,
        testutil::{User, failing_decoder, failing_encoder, user_decoder, user_encoder},
    };

    fn karl_and_john() -> MemoryBackend {
        let mut storage = MemoryBackend::new();
        storage.append(&User::new("Karl"), &user_encoder()).unwrap();
        storage.append(&User::new("John"), &user_encoder()).unwrap();
        storage
    }

    #[test]
    fn empty_storage_reads() {
        let storage = MemoryBackend::new();
        assert!(storage.all::<User, _>(&user_decoder()).unwrap().is_empty());
        assert_eq!(storage.first::<User, _>(&user_decoder()).unwrap(), None);
        assert_eq!(storage.last::<User, _>(&user_decoder()).unwrap(), None);
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn remove_on_empty_storage_returns_none() {
        let mut storage = MemoryBackend::new();
        let removed = storage.remove(&user_decoder(), |_: &User| true).unwrap();
        assert_eq!(removed, None);
    }

    #[test]
    fn append_preserves_order() {
        let storage = karl_and_john();
        let names: Vec<String> =
            storage.all(&user_decoder()).unwrap().into_iter().map(|u: User| u.name).collect();
        assert_eq!(names, ["Karl", "John"]);
    }

    #[test]
    fn derived_queries() {
        let storage = karl_and_john();
        let decoder = user_decoder();

        assert_eq!(storage.first(&decoder).unwrap(), Some(User::new("Karl")));
        assert_eq!(storage.last(&decoder).unwrap(), Some(User::new("John")));
        assert_eq!(
            storage.first_where(&decoder, |u: &User| u.name.starts_with('J')).unwrap(),
            Some(User::new("John"))
        );
        assert!(storage.contains(&decoder, |u: &User| u.name == "Karl").unwrap());
        assert!(!storage.contains(&decoder, |u: &User| u.name == "Nobody").unwrap());
        assert_eq!(
            storage.filter(&decoder, |u: &User| u.name.len() == 4).unwrap(),
            vec![User::new("Karl"), User::new("John")]
        );
    }

    #[test]
    fn remove_takes_lowest_matching_index() {
        let mut storage = MemoryBackend::new();
        let users = [User::new("A"), User::new("B"), User::new("A")];
        storage.append_all(&users, &user_encoder()).unwrap();

        let removed = storage.remove(&user_decoder(), |u: &User| u.name == "A").unwrap();
        assert_eq!(removed, Some(User::new("A")));
        assert_eq!(storage.all(&user_decoder()).unwrap(), vec![User::new("B"), User::new("A")]);
    }

    #[test]
    fn remove_without_match_leaves_count() {
        let mut storage = karl_and_john();
        let removed = storage.remove(&user_decoder(), |u: &User| u.name == "Nobody").unwrap();
        assert_eq!(removed, None);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn append_all_fails_fast_without_writing() {
        let mut storage = karl_and_john();
        let encoder = |u: &User| -> Result<Record, CodecError> {
            if u.name == "bad" {
                Err(CodecError::new("refusing to encode"))
            } else {
                Ok(Bytes::from(u.name.clone().into_bytes()))
            }
        };

        let batch = [User::new("ok"), User::new("bad"), User::new("never")];
        let err = storage.append_all(&batch, &encoder).unwrap_err();
        assert!(matches!(err, StorageError::Codec(_)));
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn failing_encoder_leaves_records_untouched() {
        let mut storage = karl_and_john();
        let before = storage.raw_data().unwrap();

        assert!(storage.append(&User::new("X"), &failing_encoder()).is_err());
        assert!(storage.replace_all(&[User::new("X")], &failing_encoder()).is_err());
        assert_eq!(storage.raw_data().unwrap(), before);
    }

    #[test]
    fn failing_decoder_leaves_records_untouched() {
        let mut storage = karl_and_john();
        let before = storage.raw_data().unwrap();

        assert!(storage.all::<User, _>(&failing_decoder()).is_err());
        assert!(storage.remove(&failing_decoder(), |_: &User| true).is_err());
        assert_eq!(storage.raw_data().unwrap(), before);
    }

    #[test]
    fn replace_all_is_idempotent() {
        let mut storage = karl_and_john();
        let replacement = [User::new("A"), User::new("B")];

        storage.replace_all(&replacement, &user_encoder()).unwrap();
        let first = storage.all::<User, _>(&user_decoder()).unwrap();
        storage.replace_all(&replacement, &user_encoder()).unwrap();
        let second = storage.all::<User, _>(&user_decoder()).unwrap();

        assert_eq!(first, replacement.to_vec());
        assert_eq!(first, second);
    }

    #[test]
    fn boxed_backend_gets_typed_operations() {
        let mut storage: Box<dyn Backend> = Box::new(MemoryBackend::new());
        storage.append(&User::new("Karl"), &user_encoder()).unwrap();
        storage.clear().unwrap();
        assert!(storage.all::<User, _>(&user_decoder()).unwrap().is_empty());
    }
}
