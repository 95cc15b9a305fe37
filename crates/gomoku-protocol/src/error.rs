//! Error types for the protocol layer.

/// Errors raised while encoding or decoding documents and frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Malformed input: bad JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Well-formed but violates the protocol, e.g. a request before `hello`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
