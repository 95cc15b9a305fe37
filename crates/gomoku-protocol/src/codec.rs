//! Codec trait and the JSON implementation used for stored documents and
//! wire frames.
//!
//! Storage and transport never touch serde directly; they go through a
//! [`Codec`] so the encoding can change in one place.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;
#[cfg(feature = "json")]
use crate::RoomStatus;

/// Converts values to bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task and the store.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use gomoku_protocol::{Codec, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&RoomId::new("r-1")).unwrap();
/// let back: RoomId = codec.decode(&bytes).unwrap();
/// assert_eq!(back, RoomId::new("r-1"));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

/// Reads only the `status` field of an encoded room document.
///
/// Every other field is skipped without being materialized, so the store
/// can route a document to its partition without decoding the room.
#[cfg(feature = "json")]
pub fn peek_status(document: &[u8]) -> Result<RoomStatus, ProtocolError> {
    #[derive(serde::Deserialize)]
    struct StatusOnly {
        status: RoomStatus,
    }

    serde_json::from_slice::<StatusOnly>(document)
        .map(|doc| doc.status)
        .map_err(ProtocolError::Decode)
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;

    #[test]
    fn test_peek_status_ignores_other_fields() {
        let doc = br#"{"id":"r-1","board":[[0,1]],"status":"playing","winner":null}"#;
        assert_eq!(peek_status(doc).unwrap(), RoomStatus::Playing);
    }

    #[test]
    fn test_peek_status_missing_field_is_decode_error() {
        let err = peek_status(br#"{"id":"r-1"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_peek_status_rejects_unknown_status() {
        assert!(peek_status(br#"{"status":"archived"}"#).is_err());
    }

    #[test]
    fn test_json_codec_decode_garbage_fails() {
        let result: Result<RoomStatus, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
