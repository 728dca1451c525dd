//! Core protocol types for Fourplay's wire format.
//!
//! Every frame is a JSON object tagged by a `"type"` field. Inbound frames
//! are first decoded into the raw [`ClientMessage`] shape and then narrowed
//! to the variant the conversation expects at that point: a [`Request`] for
//! the first frame, a [`MoveRequest`] for every frame after that.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One of the two seats at the board.
///
/// `#[serde(rename_all = "lowercase")]` makes `Player::Red` travel as the
/// string `"red"`, which is what the browser client colors discs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    /// The player who started the game. Moves first.
    Red,
    /// The player who joined with the join token.
    Yellow,
}

impl Player {
    /// Returns the opponent.
    pub fn other(self) -> Self {
        match self {
            Self::Red => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Yellow => write!(f, "yellow"),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Every frame a client may send, as it appears on the wire.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///   `{ "type": "init", "join": "..." }`
///   `{ "type": "play", "column": 3 }`
/// A frame whose `"type"` is anything else fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// The opening frame of every connection.
    ///
    /// Which optional token is present decides the entry path; see
    /// [`Request`].
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        watch: Option<String>,
    },

    /// Drop a disc into `column`.
    ///
    /// Signed so that a negative column still decodes and can be refused
    /// as off the board instead of as a malformed frame.
    Play { column: i64 },
}

impl ClientMessage {
    /// The value of the `"type"` tag for this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Play { .. } => "play",
        }
    }

    /// Every field name strict validation accepts for this message type.
    pub fn allowed_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Init { .. } => &["type", "join", "watch"],
            Self::Play { .. } => &["type", "column"],
        }
    }
}

/// The decoded intent of a connection's first frame.
///
/// This replaces "look at which optional field happens to be present" with
/// a closed set of variants decided once at the protocol boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Create a new game and play it as the first player.
    Start,
    /// Attach to an existing game as the second player.
    Join { token: String },
    /// Attach to an existing game as a spectator.
    Watch { token: String },
}

impl TryFrom<ClientMessage> for Request {
    type Error = ProtocolError;

    fn try_from(msg: ClientMessage) -> Result<Self, Self::Error> {
        match msg {
            ClientMessage::Init {
                join: None,
                watch: None,
            } => Ok(Self::Start),
            ClientMessage::Init {
                join: Some(token),
                watch: None,
            } => Ok(Self::Join { token }),
            ClientMessage::Init {
                join: None,
                watch: Some(token),
            } => Ok(Self::Watch { token }),
            ClientMessage::Init { .. } => Err(ProtocolError::InvalidMessage(
                "init names both a join and a watch token".into(),
            )),
            other => Err(ProtocolError::InvalidMessage(format!(
                "first message must be init, got {}",
                other.kind()
            ))),
        }
    }
}

/// A player's request to drop a disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub column: i64,
}

impl TryFrom<ClientMessage> for MoveRequest {
    type Error = ProtocolError;

    fn try_from(msg: ClientMessage) -> Result<Self, Self::Error> {
        match msg {
            ClientMessage::Play { column } => Ok(Self { column }),
            other => Err(ProtocolError::InvalidMessage(format!(
                "expected play, got {}",
                other.kind()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Every event the broker sends.
///
/// `init` and `error` go to a single connection; `play` and `win` are
/// broadcast to a session's whole connection group (and `play` is also
/// used to replay history to a late spectator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Sent to the creator of a game: the tokens to build share links from.
    Init { join: String, watch: String },

    /// A human-readable problem report for one client.
    Error { message: String },

    /// A disc landed at (`column`, `row`). Row 0 is the bottom.
    Play {
        player: Player,
        column: usize,
        row: usize,
    },

    /// The game is over. Carries only the winner, not the winning move.
    Win { player: Player },
}

impl ServerEvent {
    /// Shorthand for an [`ServerEvent::Error`] event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client parses these exact JSON shapes, so most tests
    //! pin the serialized form rather than round-tripping.

    use super::*;

    fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    // =====================================================================
    // Player
    // =====================================================================

    #[test]
    fn test_player_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Player::Red).unwrap(), "\"red\"");
        assert_eq!(
            serde_json::to_string(&Player::Yellow).unwrap(),
            "\"yellow\""
        );
    }

    #[test]
    fn test_player_other_swaps_seats() {
        assert_eq!(Player::Red.other(), Player::Yellow);
        assert_eq!(Player::Yellow.other(), Player::Red);
    }

    #[test]
    fn test_player_display_matches_wire_value() {
        assert_eq!(Player::Red.to_string(), "red");
        assert_eq!(Player::Yellow.to_string(), "yellow");
    }

    // =====================================================================
    // Request
    // =====================================================================

    fn request(json: &str) -> Result<Request, ProtocolError> {
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        Request::try_from(msg)
    }

    #[test]
    fn test_request_without_tokens_is_start() {
        assert_eq!(request(r#"{"type":"init"}"#).unwrap(), Request::Start);
    }

    #[test]
    fn test_request_with_join_token_is_join() {
        assert_eq!(
            request(r#"{"type":"init","join":"abc"}"#).unwrap(),
            Request::Join {
                token: "abc".into()
            }
        );
    }

    #[test]
    fn test_request_with_watch_token_is_watch() {
        assert_eq!(
            request(r#"{"type":"init","watch":"xyz"}"#).unwrap(),
            Request::Watch {
                token: "xyz".into()
            }
        );
    }

    #[test]
    fn test_request_with_both_tokens_is_rejected() {
        let err = request(r#"{"type":"init","join":"a","watch":"b"}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_request_from_play_is_rejected() {
        let err = request(r#"{"type":"play","column":1}"#).unwrap_err();
        assert!(err.to_string().contains("first message must be init"));
    }

    #[test]
    fn test_client_message_missing_type_fails_to_decode() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"join":"abc"}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // MoveRequest
    // =====================================================================

    #[test]
    fn test_move_request_from_play() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"play","column":6}"#).unwrap();
        assert_eq!(
            MoveRequest::try_from(msg).unwrap(),
            MoveRequest { column: 6 }
        );
    }

    #[test]
    fn test_move_request_from_init_is_rejected() {
        let msg = ClientMessage::Init {
            join: None,
            watch: None,
        };
        assert!(MoveRequest::try_from(msg).is_err());
    }

    #[test]
    fn test_play_without_column_fails_to_decode() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"play"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_play_with_negative_column_decodes() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"play","column":-1}"#).unwrap();
        assert_eq!(
            MoveRequest::try_from(msg).unwrap(),
            MoveRequest { column: -1 }
        );
    }

    #[test]
    fn test_play_with_fractional_column_fails_to_decode() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"play","column":1.5}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerEvent: one test per variant to pin the JSON shape
    // =====================================================================

    #[test]
    fn test_server_event_init_json_format() {
        let json = to_json(&ServerEvent::Init {
            join: "j".into(),
            watch: "w".into(),
        });
        assert_eq!(
            json,
            serde_json::json!({"type": "init", "join": "j", "watch": "w"})
        );
    }

    #[test]
    fn test_server_event_error_json_format() {
        let json = to_json(&ServerEvent::error("Game not found."));
        assert_eq!(
            json,
            serde_json::json!({"type": "error", "message": "Game not found."})
        );
    }

    #[test]
    fn test_server_event_play_json_format() {
        let json = to_json(&ServerEvent::Play {
            player: Player::Yellow,
            column: 3,
            row: 0,
        });
        assert_eq!(
            json,
            serde_json::json!({"type": "play", "player": "yellow", "column": 3, "row": 0})
        );
    }

    #[test]
    fn test_server_event_win_carries_only_player() {
        let json = to_json(&ServerEvent::Win {
            player: Player::Red,
        });
        assert_eq!(json, serde_json::json!({"type": "win", "player": "red"}));
    }
}
