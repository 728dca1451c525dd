//! Error types for the protocol layer.
//!
//! Every protocol error is connection-fatal: the handler closes the
//! connection without sending any feedback.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into a text frame).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a frame into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing or unknown `"type"` tag,
    /// missing required fields, or wrong data types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but is not valid at this point of the conversation.
    ///
    /// For example a `play` request as the first frame, or an `init`
    /// request that names both a join and a watch token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Strict validation found a field that the frame's type does not allow.
    #[error("unexpected field {field:?} in {kind:?} message")]
    UnexpectedField { kind: String, field: String },
}
