/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer connected but the WebSocket handshake failed.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(#[source] std::io::Error),

    /// The peer connected but never completed the WebSocket handshake.
    #[error("upgrade timed out after {0:?}")]
    UpgradeTimedOut(std::time::Duration),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
