//! Wire protocol for Fourplay.
//!
//! This crate defines the "language" that browsers and the broker speak:
//!
//! - **Types** ([`ClientMessage`], [`Request`], [`MoveRequest`],
//!   [`ServerEvent`], [`Player`]): the JSON objects that travel on the
//!   wire, each tagged by a `"type"` field.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`Validation`]): how those
//!   objects are converted to/from text frames.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the session
//! handler. It doesn't know about connections, tokens or games; it only
//! knows how to serialize and deserialize events.
//!
//! ```text
//! Transport (frames) → Protocol (Request / MoveRequest) → Handler
//! Handler (ServerEvent) → Protocol (text) → Transport / Group
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, Validation};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, MoveRequest, Player, Request, ServerEvent};
