//! Unified error type for the Fourplay broker.

use fourplay_group::GroupError;
use fourplay_protocol::ProtocolError;
use fourplay_session::RegistryError;
use fourplay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
///
/// Inside a connection handler, any of these ends that connection's task
/// and nothing else. Game-domain problems (unknown token, rejected move)
/// never surface here: they become `error` events instead.
#[derive(Debug, thiserror::Error)]
pub enum FourplayError {
    /// A transport-level error (bind, accept, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed or unexpected frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection-group error (actor gone, duplicate member).
    #[error(transparent)]
    Group(#[from] GroupError),

    /// A registry error that could not be reported to the client.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::UpgradeTimedOut(std::time::Duration::from_secs(10));
        let fourplay_err: FourplayError = err.into();
        assert!(matches!(fourplay_err, FourplayError::Transport(_)));
        assert!(fourplay_err.to_string().contains("upgrade timed out"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let fourplay_err: FourplayError = err.into();
        assert!(matches!(fourplay_err, FourplayError::Protocol(_)));
    }

    #[test]
    fn test_from_group_error() {
        let fourplay_err: FourplayError = GroupError::Closed.into();
        assert!(matches!(fourplay_err, FourplayError::Group(_)));
    }

    #[test]
    fn test_from_registry_error_keeps_user_message() {
        let fourplay_err: FourplayError = RegistryError::NotFound.into();
        assert_eq!(fourplay_err.to_string(), "Game not found.");
    }
}
