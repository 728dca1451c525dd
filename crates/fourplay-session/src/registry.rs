//! The session registry: two token tables pointing at shared sessions.
//!
//! # Concurrency note
//!
//! `Registry` is NOT thread-safe by itself; it uses plain `HashMap`s.
//! The server wraps it in a single mutex; lookups and mutations are short
//! and never await, so the lock is only ever held briefly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;

use crate::{EvictionPolicy, RegistryConfig, RegistryError, Session, SessionId};

/// A watch-table entry. Remembers when the creator left so the eviction
/// policy can decide when to forget the session.
struct WatchEntry {
    session: Arc<Session>,
    released_at: Option<Instant>,
}

/// Maps join and watch tokens to sessions.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ [join + watch] ──release_join()──→ [watch only] ──evict──→ gone
///                   │                                  │
///              resolve_join()                    resolve_watch()
///              resolve_watch()
/// ```
///
/// Resolving never touches a session's connection group; attaching the
/// connection is the caller's job.
pub struct Registry {
    /// Sessions that still accept a second player, keyed by join token.
    join: HashMap<String, Arc<Session>>,

    /// Every watchable session, keyed by watch token.
    watch: HashMap<String, WatchEntry>,

    config: RegistryConfig,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            join: HashMap::new(),
            watch: HashMap::new(),
            config,
        }
    }

    /// The policies this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates a new session and registers it under two fresh tokens.
    ///
    /// Also sweeps stale watch entries, so a busy server keeps its tables
    /// bounded without a timer.
    pub fn create(&mut self) -> Arc<Session> {
        self.evict_stale();

        let join_token = self.unused_token();
        let watch_token = self.unused_token();
        let session = Arc::new(Session::new(join_token.clone(), watch_token.clone()));

        self.join.insert(join_token, Arc::clone(&session));
        self.watch.insert(
            watch_token,
            WatchEntry {
                session: Arc::clone(&session),
                released_at: None,
            },
        );

        tracing::info!(session = %session.id(), "session created");
        session
    }

    /// Looks up a session by join token.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] if the token is unknown or its
    /// creator has already left.
    pub fn resolve_join(&self, token: &str) -> Result<Arc<Session>, RegistryError> {
        self.join
            .get(token)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }

    /// Looks up a session by watch token.
    ///
    /// A session that is due for eviction is evicted here and reported as
    /// not found.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] if the token is unknown or the
    /// session has been evicted.
    pub fn resolve_watch(&mut self, token: &str) -> Result<Arc<Session>, RegistryError> {
        let entry = self.watch.get(token).ok_or(RegistryError::NotFound)?;
        if self.is_stale(entry) {
            let id = entry.session.id();
            self.watch.remove(token);
            tracing::info!(session = %id, "session evicted");
            return Err(RegistryError::NotFound);
        }
        Ok(Arc::clone(&entry.session))
    }

    /// Removes a session from the join table. Its watch entry stays.
    ///
    /// Called exactly once per session, when the creator's connection
    /// closes. Returns `false` (and logs) if the token was not present.
    pub fn release_join(&mut self, token: &str) -> bool {
        let Some(session) = self.join.remove(token) else {
            tracing::warn!("release_join called for an unknown join token");
            return false;
        };

        if let Some(entry) = self.watch.get_mut(session.watch_token()) {
            entry.released_at = Some(Instant::now());
        }

        tracing::info!(session = %session.id(), "session no longer joinable");
        true
    }

    /// Drops every watch entry the eviction policy says is stale.
    ///
    /// Returns the ids of the evicted sessions. Under
    /// [`EvictionPolicy::Never`] nothing is ever stale, so the table is not
    /// scanned at all.
    pub fn evict_stale(&mut self) -> Vec<SessionId> {
        if self.config.eviction == EvictionPolicy::Never {
            return Vec::new();
        }

        let stale: Vec<String> = self
            .watch
            .iter()
            .filter(|(_, entry)| self.is_stale(entry))
            .map(|(token, _)| token.clone())
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for token in stale {
            if let Some(entry) = self.watch.remove(&token) {
                tracing::info!(session = %entry.session.id(), "session evicted");
                evicted.push(entry.session.id());
            }
        }
        evicted
    }

    /// Number of joinable sessions.
    pub fn len(&self) -> usize {
        self.join.len()
    }

    /// Returns `true` if no session is joinable.
    pub fn is_empty(&self) -> bool {
        self.join.is_empty()
    }

    /// Number of watchable sessions (including ones not yet swept).
    pub fn watch_len(&self) -> usize {
        self.watch.len()
    }

    fn is_stale(&self, entry: &WatchEntry) -> bool {
        let Some(released_at) = entry.released_at else {
            return false;
        };
        match self.config.eviction {
            EvictionPolicy::Never => false,
            EvictionPolicy::WhenEmpty => entry.session.group().member_count() == 0,
            EvictionPolicy::AfterRelease(ttl) => released_at.elapsed() >= ttl,
        }
    }

    /// Generates a token that no live session uses.
    fn unused_token(&self) -> String {
        loop {
            let token = generate_token();
            if !self.join.contains_key(&token) && !self.watch.contains_key(&token) {
                return token;
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// `rand::rng()` is a cryptographically secure generator seeded from the
/// OS. Hex digits are URL-safe, so tokens can go straight into share links.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `Registry`.
    //!
    //! Time-dependent eviction is tested with a zero TTL (stale
    //! immediately) or a very long one (never stale during the test).

    use std::collections::HashSet;
    use std::time::Duration;

    use fourplay_transport::ConnectionId;

    use super::*;
    use crate::JoinPolicy;

    fn registry(eviction: EvictionPolicy) -> Registry {
        Registry::new(RegistryConfig {
            join_policy: JoinPolicy::SingleUse,
            eviction,
        })
    }

    #[test]
    fn test_generate_token_is_32_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_is_unique() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[tokio::test]
    async fn test_create_registers_both_tokens() {
        let mut reg = Registry::default();
        let session = reg.create();

        assert_ne!(session.join_token(), session.watch_token());
        let joined = reg.resolve_join(session.join_token()).unwrap();
        let watched = reg.resolve_watch(session.watch_token()).unwrap();
        assert!(Arc::ptr_eq(&joined, &session));
        assert!(Arc::ptr_eq(&watched, &session));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.watch_len(), 1);
    }

    #[tokio::test]
    async fn test_tokens_are_not_interchangeable() {
        let mut reg = Registry::default();
        let session = reg.create();

        assert_eq!(
            reg.resolve_join(session.watch_token()).unwrap_err(),
            RegistryError::NotFound
        );
        assert_eq!(
            reg.resolve_watch(session.join_token()).unwrap_err(),
            RegistryError::NotFound
        );
    }

    #[tokio::test]
    async fn test_resolve_unknown_token_is_not_found_and_mutates_nothing() {
        let mut reg = Registry::default();
        reg.create();

        assert_eq!(reg.resolve_join("nope").unwrap_err(), RegistryError::NotFound);
        assert_eq!(reg.resolve_watch("nope").unwrap_err(), RegistryError::NotFound);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.watch_len(), 1);
    }

    #[tokio::test]
    async fn test_release_join_keeps_watch_entry() {
        let mut reg = registry(EvictionPolicy::Never);
        let session = reg.create();

        assert!(reg.release_join(session.join_token()));

        assert_eq!(
            reg.resolve_join(session.join_token()).unwrap_err(),
            RegistryError::NotFound
        );
        assert!(reg.resolve_watch(session.watch_token()).is_ok());
    }

    #[tokio::test]
    async fn test_release_join_twice_returns_false() {
        let mut reg = Registry::default();
        let session = reg.create();

        assert!(reg.release_join(session.join_token()));
        assert!(!reg.release_join(session.join_token()));
    }

    #[tokio::test]
    async fn test_eviction_never_keeps_released_sessions() {
        let mut reg = registry(EvictionPolicy::Never);
        let session = reg.create();
        reg.release_join(session.join_token());

        assert!(reg.evict_stale().is_empty());
        assert_eq!(reg.watch_len(), 1);
    }

    #[tokio::test]
    async fn test_create_under_never_keeps_every_released_session() {
        let mut reg = registry(EvictionPolicy::Never);
        let sessions: Vec<_> = (0..5).map(|_| reg.create()).collect();
        for session in &sessions {
            reg.release_join(session.join_token());
        }

        reg.create();

        assert_eq!(reg.watch_len(), 6);
        for session in &sessions {
            assert!(reg.resolve_watch(session.watch_token()).is_ok());
        }
    }

    #[tokio::test]
    async fn test_eviction_after_release_zero_ttl_evicts_on_watch() {
        let mut reg = registry(EvictionPolicy::AfterRelease(Duration::ZERO));
        let session = reg.create();
        reg.release_join(session.join_token());

        assert_eq!(
            reg.resolve_watch(session.watch_token()).unwrap_err(),
            RegistryError::NotFound
        );
        assert_eq!(reg.watch_len(), 0);
    }

    #[tokio::test]
    async fn test_eviction_after_release_long_ttl_keeps_session() {
        let mut reg = registry(EvictionPolicy::AfterRelease(Duration::from_secs(3600)));
        let session = reg.create();
        reg.release_join(session.join_token());

        assert!(reg.resolve_watch(session.watch_token()).is_ok());
        assert!(reg.evict_stale().is_empty());
    }

    #[tokio::test]
    async fn test_eviction_never_touches_unreleased_sessions() {
        let mut reg = registry(EvictionPolicy::AfterRelease(Duration::ZERO));
        let session = reg.create();

        assert!(reg.evict_stale().is_empty());
        assert!(reg.resolve_watch(session.watch_token()).is_ok());
    }

    #[tokio::test]
    async fn test_eviction_when_empty_waits_for_last_member() {
        let mut reg = registry(EvictionPolicy::WhenEmpty);
        let session = reg.create();

        let conn = ConnectionId::new(1);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        session.group().add(conn, tx).await.unwrap();
        reg.release_join(session.join_token());

        // A spectator is still attached.
        assert!(reg.resolve_watch(session.watch_token()).is_ok());

        session.group().remove(conn).unwrap();
        session.group().snapshot().await.unwrap();

        assert_eq!(reg.evict_stale(), vec![session.id()]);
        assert_eq!(reg.watch_len(), 0);
    }

    #[tokio::test]
    async fn test_create_sweeps_stale_sessions() {
        let mut reg = registry(EvictionPolicy::AfterRelease(Duration::ZERO));
        let old = reg.create();
        reg.release_join(old.join_token());
        assert_eq!(reg.watch_len(), 1);

        reg.create();
        assert_eq!(reg.watch_len(), 1);
        assert!(reg.resolve_watch(old.watch_token()).is_err());
    }
}
