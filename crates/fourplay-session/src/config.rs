//! Registry policies.

use std::time::Duration;

/// What happens when more than one connection presents the same join token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinPolicy {
    /// The first join claims the second-player seat; every later join with
    /// the same token, concurrent or not, is refused with "Game is full."
    /// until that player disconnects.
    #[default]
    SingleUse,

    /// Every join attaches as second player. Both connections may then move
    /// for the second player; the engine still enforces turn order.
    Shared,
}

/// When a session becomes unreachable through its watch token.
///
/// Only sessions whose join token has been released (the creator's
/// connection closed) are ever evicted. Eviction is checked lazily, on
/// [`Registry::create`](crate::Registry::create),
/// [`Registry::resolve_watch`](crate::Registry::resolve_watch) and
/// [`Registry::evict_stale`](crate::Registry::evict_stale); there is no
/// background timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep watch entries forever.
    Never,

    /// Evict once the session has no connected members left.
    WhenEmpty,

    /// Evict this long after the join token was released.
    AfterRelease(Duration),
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::AfterRelease(Duration::from_secs(60 * 60))
    }
}

/// Configuration for the session registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    pub join_policy: JoinPolicy,
    pub eviction: EvictionPolicy,
}
