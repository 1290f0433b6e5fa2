//! # Payload Codec
//!
//! Turns an arbitrary serde value into the byte sequence that gets hidden in
//! an image, and back.
//!
//! ## Wire Format
//!
//! The body is JSON, framed with a magic tag and a 4-byte length prefix
//! (big-endian), the same framing used for length-prefixed JSON messages:
//! ```text
//! [4 bytes: "IMK1"] [4 bytes: body length] [N bytes: JSON body]
//! ```
//!
//! Bytes after the body are ignored. Unpacking a full channel always yields
//! more bytes than were written (the zero padding comes back as extra bytes),
//! so the length prefix marks where the payload really ends.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MarkError, Result};

/// Tag written in front of every payload.
pub const MAGIC: [u8; 4] = *b"IMK1";

/// Size of the magic tag plus the length prefix.
pub const HEADER_LEN: usize = 8;

/// Serialize a value into a framed payload.
///
/// # Errors
/// - [`MarkError::Serialization`] if serde cannot represent the value as JSON
///   (e.g. a map with non-string keys)
///
/// # Example
/// ```ignore
/// let bytes = payload::serialize(&"hi")?;
/// assert_eq!(&bytes[..4], b"IMK1");
/// ```
pub fn serialize<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(value).map_err(|e| MarkError::Serialization(e.to_string()))?;
    let length = u32::try_from(body.len())
        .map_err(|_| MarkError::Serialization(format!("body of {} bytes", body.len())))?;

    let mut data = Vec::with_capacity(HEADER_LEN + body.len());
    data.extend_from_slice(&MAGIC);
    data.extend_from_slice(&length.to_be_bytes());
    data.extend_from_slice(&body);
    Ok(data)
}

/// Parse a framed payload, ignoring any trailing bytes.
///
/// # Errors
/// - [`MarkError::Deserialize`] when the magic tag is missing, the length
///   prefix points past the end of `bytes`, or the body is not a valid `T`
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    if bytes.len() < HEADER_LEN {
        return Err(MarkError::Deserialize(format!(
            "need at least {} header bytes, got {}",
            HEADER_LEN,
            bytes.len()
        )));
    }

    if bytes[..4] != MAGIC {
        return Err(MarkError::Deserialize("missing payload tag".to_string()));
    }

    let mut length_buf = [0u8; 4];
    length_buf.copy_from_slice(&bytes[4..HEADER_LEN]);
    let length = u32::from_be_bytes(length_buf) as usize;

    let body = bytes
        .get(HEADER_LEN..HEADER_LEN + length)
        .ok_or_else(|| {
            MarkError::Deserialize(format!(
                "body length {} exceeds the {} bytes available",
                length,
                bytes.len() - HEADER_LEN
            ))
        })?;

    serde_json::from_slice(body).map_err(|e| MarkError::Deserialize(e.to_string()))
}

/// Parse a framed payload, falling back to `T::default()` on any failure.
///
/// This is the permissive decode path: an image that was never watermarked,
/// or whose payload was truncated, yields the empty value instead of an error.
pub fn deserialize_or_default<T>(bytes: &[u8]) -> T
where
    T: DeserializeOwned + Default,
{
    match deserialize(bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!("Falling back to default payload: {}", e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Record {
        owner: String,
        views: u32,
    }

    #[test]
    fn test_string_frame_layout() {
        let bytes = serialize("hi").unwrap();
        assert_eq!(&bytes[..4], b"IMK1");
        assert_eq!(&bytes[4..8], &4u32.to_be_bytes());
        assert_eq!(&bytes[8..], b"\"hi\"");
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let record = Record {
            owner: "alice".to_string(),
            views: 5,
        };
        assert_eq!(serialize(&record).unwrap(), serialize(&record).unwrap());
    }

    #[test]
    fn test_record_ignores_trailing_padding() {
        let record = Record {
            owner: "alice".to_string(),
            views: 5,
        };
        let mut bytes = serialize(&record).unwrap();
        bytes.extend_from_slice(&[0u8; 32]);

        let decoded: Record = deserialize(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_unsupported_value_is_serialization_error() {
        let mut map = HashMap::new();
        map.insert((1u8, 2u8), "tuple keys are not JSON");

        assert!(matches!(
            serialize(&map),
            Err(MarkError::Serialization(_))
        ));
    }

    #[test]
    fn test_corrupt_input_is_deserialize_error() {
        assert!(matches!(
            deserialize::<String>(&[0u8; 64]),
            Err(MarkError::Deserialize(_))
        ));
        assert!(matches!(
            deserialize::<String>(b"IMK"),
            Err(MarkError::Deserialize(_))
        ));

        // Length prefix larger than what is left
        let mut bytes = serialize("truncated").unwrap();
        bytes.truncate(10);
        assert!(matches!(
            deserialize::<String>(&bytes),
            Err(MarkError::Deserialize(_))
        ));
    }

    #[test]
    fn test_wrong_type_falls_back_to_default() {
        let bytes = serialize(&42u32).unwrap();
        let decoded: String = deserialize_or_default(&bytes);
        assert_eq!(decoded, "");

        let decoded: Record = deserialize_or_default(&[0xFF; 16]);
        assert_eq!(decoded, Record::default());
    }
}
