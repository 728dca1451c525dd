//! Codec trait and implementations for serializing/deserializing events.
//!
//! A "codec" (coder/decoder) converts between Rust types and frames.
//! Outbound events are encoded once into a `String` and that same text is
//! handed to every recipient, so encoding produces text rather than bytes.
//! Inbound frames arrive as raw bytes (a browser may send text or binary).

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;

use crate::{ClientMessage, ProtocolError};

/// A codec that can encode Rust types to text and decode bytes back.
///
/// - `Send + Sync` → the codec is shared by every connection task.
/// - `'static` → it doesn't borrow temporary data.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// How strictly inbound frames are checked.
///
/// Both modes reject frames with an unknown `"type"` or missing required
/// fields. They differ only in how they treat fields nobody asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Any field not defined for the frame's type is a protocol violation.
    Strict,

    /// Unknown fields are ignored.
    #[default]
    Lenient,
}

impl Validation {
    /// Decodes one inbound frame into a [`ClientMessage`].
    ///
    /// In [`Validation::Strict`] mode the frame is decoded a second time as
    /// a plain key map and every key is checked against
    /// [`ClientMessage::allowed_fields`]. The key map uses `IgnoredAny`, so
    /// this works with any self-describing codec.
    ///
    /// # Errors
    /// - `ProtocolError::Decode` if the frame is not a known message.
    /// - `ProtocolError::UnexpectedField` for extra fields in strict mode.
    pub fn decode_client<C: Codec>(
        self,
        codec: &C,
        data: &[u8],
    ) -> Result<ClientMessage, ProtocolError> {
        let msg: ClientMessage = codec.decode(data)?;

        if self == Validation::Strict {
            let fields: BTreeMap<String, IgnoredAny> = codec.decode(data)?;
            let allowed = msg.allowed_fields();
            if let Some(field) =
                fields.keys().find(|key| !allowed.contains(&key.as_str()))
            {
                return Err(ProtocolError::UnexpectedField {
                    kind: msg.kind().to_string(),
                    field: field.clone(),
                });
            }
        }

        Ok(msg)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what the browser client speaks, and it is human-readable, so
/// frames can be inspected in DevTools and in logs.
///
/// ## Example
///
/// ```rust
/// use fourplay_protocol::{Codec, JsonCodec, Player, ServerEvent};
///
/// let codec = JsonCodec;
/// let text = codec
///     .encode(&ServerEvent::Win { player: Player::Red })
///     .unwrap();
/// assert_eq!(text, r#"{"type":"win","player":"red"}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
