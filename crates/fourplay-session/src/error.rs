//! Error types for the session layer.

/// Errors that can occur while resolving or attaching to a session.
///
/// Both variants are normal outcomes, not crashes: the handler sends the
/// `Display` text to the client as an `error` event and closes the
/// connection gracefully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No session is registered under the presented token. It may never
    /// have existed, its creator may have left (join tokens), or it may
    /// have been evicted (watch tokens).
    #[error("Game not found.")]
    NotFound,

    /// Under [`JoinPolicy::SingleUse`](crate::JoinPolicy::SingleUse), the
    /// second-player seat was already claimed with this join token.
    #[error("Game is full.")]
    SeatTaken,
}
