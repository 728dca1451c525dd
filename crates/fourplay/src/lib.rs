//! # Fourplay
//!
//! Realtime session broker for two-player Connect Four.
//!
//! A browser opens a WebSocket and sends one `init` frame. With no token it
//! starts a game and receives a join token (for the opponent) and a watch
//! token (for spectators). Moves from either player are validated by the
//! game engine and broadcast to everyone attached to the game; spectators
//! who arrive late get the move history replayed first.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fourplay::prelude::*;
//!
//! # async fn run() -> Result<(), FourplayError> {
//! let server = FourplayServerBuilder::new()
//!     .bind("0.0.0.0:8001")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::FourplayError;
pub use server::{FourplayServer, FourplayServerBuilder};

/// Everything needed to configure and run a server, plus the wire types
/// for writing clients and tests.
pub mod prelude {
    pub use crate::{FourplayError, FourplayServer, FourplayServerBuilder};
    pub use fourplay_protocol::{ClientMessage, Player, ServerEvent, Validation};
    pub use fourplay_session::{EvictionPolicy, JoinPolicy, RegistryConfig};
}
