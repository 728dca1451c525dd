//! Game sessions and the token-keyed registry for Fourplay.
//!
//! This crate answers one question: "which game does this token open?"
//!
//! 1. **Sessions**: one game engine plus the connection group subscribed
//!    to it ([`Session`]), and the seat a connection takes in it ([`Role`])
//! 2. **Registry**: two token tables, one for join tokens and one for
//!    watch tokens ([`Registry`])
//! 3. **Policies**: what a second join with the same token does
//!    ([`JoinPolicy`]) and when a finished session is forgotten
//!    ([`EvictionPolicy`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Handler (above)   ← resolves tokens, attaches connections, relays moves
//!     ↕
//! Session Layer (this crate)   ← token → session lookup
//!     ↕
//! Engine + Group (below)   ← game rules, broadcast fan-out
//! ```

mod config;
mod error;
mod registry;
mod session;

pub use config::{EvictionPolicy, JoinPolicy, RegistryConfig};
pub use error::RegistryError;
pub use registry::Registry;
pub use session::{Frame, Role, Session, SessionId};
