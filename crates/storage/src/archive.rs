//! Binary framing for a list of records.
//!
//! File and preference backends persist their whole record list as one blob.
//! The layout is:
//!
//! ```text
//! ┌────────┬──────────┬──────────┬─────────┬──────────┬─────────┬───┐
//! │ "LSA1" │ count:u32│ len0:u32 │ bytes0  │ len1:u32 │ bytes1  │ … │
//! └────────┴──────────┴──────────┴─────────┴──────────┴─────────┴───┘
//! ```
//!
//! All integers are big-endian. An empty blob decodes to an empty list so a
//! freshly created file needs no initialisation.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    backend::Record,
    error::{StorageError, StorageResult},
};

const MAGIC: &[u8; 4] = b"LSA1";

/// Size of the fixed header (magic + record count).
const HEADER_LEN: usize = MAGIC.len() + 4;

/// Serializes `records` into one archive blob.
///
/// # Errors
///
/// Returns [`StorageError::Corrupted`] labelled with `path` if the record
/// count or a record length does not fit the `u32` frame fields.
pub(crate) fn encode(path: &str, records: &[Record]) -> StorageResult<Bytes> {
    let body: usize = records.iter().map(|r| 4 + r.len()).sum();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + body);
    buf.put_slice(MAGIC);
    buf.put_u32(frame_len(path, "record count", records.len())?);
    for (index, record) in records.iter().enumerate() {
        buf.put_u32(frame_len(path, &format!("record {index}"), record.len())?);
        buf.put_slice(record);
    }
    Ok(buf.freeze())
}

fn frame_len(path: &str, what: &str, len: usize) -> StorageResult<u32> {
    u32::try_from(len)
        .map_err(|_| StorageError::corrupted(path, format!("{what} of {len} exceeds the u32 archive frame")))
}

/// Parses an archive blob produced by [`encode`].
///
/// `path` only labels the error.
pub(crate) fn decode(path: &str, mut blob: Bytes) -> StorageResult<Vec<Record>> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }
    if blob.len() < HEADER_LEN || &blob[..MAGIC.len()] != MAGIC {
        return Err(StorageError::corrupted(path, "missing archive header"));
    }
    blob.advance(MAGIC.len());

    let count = blob.get_u32() as usize;
    let mut records = Vec::with_capacity(count.min(blob.remaining() / 4));
    for index in 0..count {
        if blob.remaining() < 4 {
            return Err(StorageError::corrupted(path, format!("record {index} has no length")));
        }
        let len = blob.get_u32() as usize;
        if blob.remaining() < len {
            return Err(StorageError::corrupted(
                path,
                format!("record {index} needs {len} bytes, {} left", blob.remaining()),
            ));
        }
        records.push(blob.split_to(len));
    }

    if blob.has_remaining() {
        return Err(StorageError::corrupted(path, "trailing bytes after last record"));
    }
    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode(records: &[Record]) -> Bytes {
        super::encode("test", records).unwrap()
    }

    #[test]
    fn empty_blob_is_empty_list() {
        assert!(decode("test", Bytes::new()).unwrap().is_empty());
    }

    #[test]
    fn preserves_order_and_empty_records() {
        let records =
            vec![Bytes::from_static(b"first"), Bytes::new(), Bytes::from_static(b"third")];
        let decoded = decode("test", encode(&records)).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn rejects_truncated_record() {
        let blob = encode(&[Bytes::from_static(b"abcdef")]);
        let truncated = blob.slice(..blob.len() - 2);
        let err = decode("prefs:users", truncated).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { ref path, .. } if path == "prefs:users"));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_frame_is_an_error_not_a_truncation() {
        let too_long = u32::MAX as usize + 1;
        let err = frame_len("file:users", "record 0", too_long).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { ref path, .. } if path == "file:users"));
        assert_eq!(frame_len("file:users", "record 0", u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[test]
    fn rejects_foreign_content() {
        assert!(decode("test", Bytes::from_static(b"{\"not\":\"an archive\"}")).is_err());
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut blob = BytesMut::from(&encode(&[Bytes::from_static(b"a")])[..]);
        blob.put_u8(0);
        assert!(decode("test", blob.freeze()).is_err());
    }
}
