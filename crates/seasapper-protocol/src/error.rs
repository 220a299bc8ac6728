//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes on the wire were the problem,
//! never the game rules. Rule violations travel as [`crate::ErrorCode`]s
//! inside a [`crate::ServerMessage::Error`].

/// Errors that can occur while turning messages into bytes and back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but is not acceptable, e.g. an empty room code.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
