//! Connection groups for Fourplay.
//!
//! A group is the live set of connections subscribed to one session's
//! events. Each group runs as an isolated Tokio task (actor model) that owns
//! the membership table; callers talk to it through a cloneable
//! [`GroupHandle`].
//!
//! # Key types
//!
//! - [`GroupHandle`]: add, remove, broadcast, snapshot
//! - [`MemberSender`]: the outbound queue a member hands to the group
//! - [`GroupError`]: what can go wrong

mod error;
mod group;

pub use error::GroupError;
pub use group::{GroupHandle, MemberSender, spawn_group};
