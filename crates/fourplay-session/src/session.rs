//! Session types: one game and everything subscribed to it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fourplay_engine::Game;
use fourplay_group::{GroupHandle, spawn_group};
use fourplay_protocol::Player;
use tokio::sync::Mutex;

use crate::{JoinPolicy, RegistryError};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One encoded outbound event. Encoded once, shared by every recipient.
pub type Frame = Arc<str>;

/// A process-unique identifier for a session, used in logs.
///
/// Tokens are secrets and never appear in logs; this id does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The seat a connection takes in a session.
///
/// Decided once, from the entry path the connection used, and never
/// reassigned:
///
/// ```text
///   start  ──→ FirstPlayer   (moves as red)
///   join   ──→ SecondPlayer  (moves as yellow)
///   watch  ──→ Spectator     (never moves)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    FirstPlayer,
    SecondPlayer,
    Spectator,
}

impl Role {
    /// The color this role plays, or `None` for spectators.
    pub fn player(self) -> Option<Player> {
        match self {
            Self::FirstPlayer => Some(Player::Red),
            Self::SecondPlayer => Some(Player::Yellow),
            Self::Spectator => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstPlayer => write!(f, "first-player"),
            Self::SecondPlayer => write!(f, "second-player"),
            Self::Spectator => write!(f, "spectator"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One in-progress or finished game.
///
/// Owns exactly one [`Game`] for its whole life and the connection group
/// that receives its events. Shared between the registry and every
/// attached connection as an `Arc<Session>`.
pub struct Session {
    id: SessionId,
    join_token: String,
    watch_token: String,

    /// The engine. Held across the "play then broadcast" step of the relay
    /// and the "snapshot history, queue replay, join group" step of a
    /// spectator attach, which keeps replay and live events gap-free.
    engine: Mutex<Game>,

    group: GroupHandle<Frame>,

    /// Set by a successful join under [`JoinPolicy::SingleUse`], cleared
    /// when that player disconnects.
    second_seat_taken: AtomicBool,
}

impl Session {
    /// Creates a session with a fresh game and an empty connection group.
    ///
    /// Spawns the group's actor task, so this must run inside a Tokio
    /// runtime.
    pub(crate) fn new(join_token: String, watch_token: String) -> Self {
        Self {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            join_token,
            watch_token,
            engine: Mutex::new(Game::new()),
            group: spawn_group(),
            second_seat_taken: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The capability string that lets a second player join.
    pub fn join_token(&self) -> &str {
        &self.join_token
    }

    /// The capability string that lets spectators watch.
    pub fn watch_token(&self) -> &str {
        &self.watch_token
    }

    /// The game engine, behind its lock.
    pub fn engine(&self) -> &Mutex<Game> {
        &self.engine
    }

    /// The connection group subscribed to this session's events.
    pub fn group(&self) -> &GroupHandle<Frame> {
        &self.group
    }

    /// Claims the second-player seat according to `policy`.
    ///
    /// Under [`JoinPolicy::SingleUse`] this is a compare-and-swap: of any
    /// number of concurrent callers exactly one succeeds.
    ///
    /// # Errors
    /// Returns [`RegistryError::SeatTaken`] if the seat is already claimed.
    pub fn claim_second_seat(&self, policy: JoinPolicy) -> Result<(), RegistryError> {
        match policy {
            JoinPolicy::Shared => Ok(()),
            JoinPolicy::SingleUse => self
                .second_seat_taken
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .map(|_| ())
                .map_err(|_| RegistryError::SeatTaken),
        }
    }

    /// Frees the second-player seat after its holder disconnects, so the
    /// join token admits one new second player.
    pub fn release_second_seat(&self) {
        self.second_seat_taken.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens are deliberately left out.
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}
