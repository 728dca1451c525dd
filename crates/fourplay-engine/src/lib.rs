//! Connect Four rules for Fourplay.
//!
//! [`Game`] is a pure, synchronous state machine: it validates a move,
//! records it, and reports a winner. It knows nothing about connections,
//! tokens or broadcasting. The session broker wraps one `Game` per session
//! and serializes access to it.

mod error;
mod game;

pub use error::PlayError;
pub use game::{Game, Move, COLUMNS, ROWS};
