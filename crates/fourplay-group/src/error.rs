//! Error types for the group layer.

use fourplay_transport::ConnectionId;

/// Errors that can occur during group operations.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// The connection is already a member of this group.
    #[error("{0} is already a member")]
    AlreadyMember(ConnectionId),

    /// The group's actor task has stopped.
    #[error("connection group is closed")]
    Closed,
}
