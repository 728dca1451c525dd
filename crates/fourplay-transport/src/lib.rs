//! Transport abstraction layer for Fourplay.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network listener. The broker only ever exchanges JSON text frames,
//! so a connection sends `&str` and receives raw bytes (text or binary
//! frames are both accepted on the way in).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection.
///
/// Connection groups use this as the membership key, so it must be unique
/// for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// `accept` only takes the next connection off the listener. Anything that
/// needs a round trip with the peer happens later, in
/// [`Incoming::establish`], so one slow peer never holds up the listener.
pub trait Transport: Send + Sync + 'static {
    /// An accepted connection that has not been set up yet.
    type Incoming: Incoming<Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A connection taken off the listener whose handshake has not run yet.
///
/// Meant to be established inside the connection's own task.
pub trait Incoming: Send + 'static {
    /// The connection type produced once the handshake completes.
    type Connection: Connection;
    /// The error type for the handshake.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake with the peer.
    async fn establish(self) -> Result<Self::Connection, Self::Error>;

    /// The id the established connection will carry.
    fn id(&self) -> ConnectionId;
}

/// A single full-duplex connection.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// one task blocks in `recv` waiting for the next request while another
/// drains the outbound queue with `send`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the remote peer.
    async fn send(&self, text: &str) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
