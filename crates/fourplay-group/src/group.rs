//! Group actor: an isolated Tokio task that owns one membership table.
//!
//! Every mutation and every broadcast goes through the actor's command
//! channel, so the actor sees them one at a time. A broadcast therefore
//! always reaches exactly the members present when the actor processes it,
//! and commands submitted in order are applied in order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fourplay_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::GroupError;

/// Channel sender for delivering outbound messages to one member.
///
/// Each connection drains its own queue into its socket, so a slow or dead
/// socket never holds up delivery to the rest of the group.
pub type MemberSender<M> = mpsc::UnboundedSender<M>;

/// Commands sent to a group actor through its channel.
enum GroupCommand<M> {
    /// Add a member.
    Add {
        conn_id: ConnectionId,
        sender: MemberSender<M>,
        reply: oneshot::Sender<Result<(), GroupError>>,
    },

    /// Remove a member.
    Remove { conn_id: ConnectionId },

    /// Deliver one message to every member.
    Broadcast { msg: M },

    /// Report the current members.
    Snapshot {
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },
}

/// Handle to a running group actor.
///
/// Cheap to clone. The actor stops once every handle has been dropped.
///
/// The command channel is unbounded so that `remove` and `broadcast` can
/// be issued from synchronous contexts (drop guards, or while holding a
/// `std` lock) without awaiting.
pub struct GroupHandle<M> {
    sender: mpsc::UnboundedSender<GroupCommand<M>>,
    members: Arc<AtomicUsize>,
}

impl<M> Clone for GroupHandle<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            members: Arc::clone(&self.members),
        }
    }
}

impl<M> std::fmt::Debug for GroupHandle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupHandle")
            .field("members", &self.member_count())
            .finish()
    }
}

impl<M> GroupHandle<M> {
    /// Number of members as of the last processed add/remove.
    pub fn member_count(&self) -> usize {
        self.members.load(Ordering::Acquire)
    }
}

impl<M: Clone + Send + 'static> GroupHandle<M> {
    /// Adds a member and waits until the actor has registered it.
    ///
    /// Every broadcast submitted after this returns reaches the new member.
    ///
    /// # Errors
    /// - [`GroupError::AlreadyMember`] if `conn_id` is already present
    /// - [`GroupError::Closed`] if the actor has stopped
    pub async fn add(
        &self,
        conn_id: ConnectionId,
        sender: MemberSender<M>,
    ) -> Result<(), GroupError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(GroupCommand::Add {
                conn_id,
                sender,
                reply: reply_tx,
            })
            .map_err(|_| GroupError::Closed)?;
        reply_rx.await.map_err(|_| GroupError::Closed)?
    }

    /// Removes a member (fire-and-forget). Removing an absent member is a
    /// no-op.
    pub fn remove(&self, conn_id: ConnectionId) -> Result<(), GroupError> {
        self.sender
            .send(GroupCommand::Remove { conn_id })
            .map_err(|_| GroupError::Closed)
    }

    /// Sends `msg` to every current member (fire-and-forget).
    ///
    /// A member whose queue is gone is skipped; the others still receive
    /// the message.
    pub fn broadcast(&self, msg: M) -> Result<(), GroupError> {
        self.sender
            .send(GroupCommand::Broadcast { msg })
            .map_err(|_| GroupError::Closed)
    }

    /// Returns the current members, sorted by id. Diagnostics only.
    pub async fn snapshot(&self) -> Result<Vec<ConnectionId>, GroupError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(GroupCommand::Snapshot { reply: reply_tx })
            .map_err(|_| GroupError::Closed)?;
        reply_rx.await.map_err(|_| GroupError::Closed)
    }

}

/// The internal actor state. Runs inside a Tokio task.
struct GroupActor<M> {
    members: HashMap<ConnectionId, MemberSender<M>>,
    count: Arc<AtomicUsize>,
    receiver: mpsc::UnboundedReceiver<GroupCommand<M>>,
}

impl<M: Clone + Send + 'static> GroupActor<M> {
    /// Runs the actor loop until every handle is dropped.
    async fn run(mut self) {
        tracing::debug!("group actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                GroupCommand::Add {
                    conn_id,
                    sender,
                    reply,
                } => {
                    let result = self.handle_add(conn_id, sender);
                    let _ = reply.send(result);
                }
                GroupCommand::Remove { conn_id } => {
                    self.handle_remove(conn_id);
                }
                GroupCommand::Broadcast { msg } => {
                    self.handle_broadcast(msg);
                }
                GroupCommand::Snapshot { reply } => {
                    let mut ids: Vec<ConnectionId> =
                        self.members.keys().copied().collect();
                    ids.sort();
                    let _ = reply.send(ids);
                }
            }
        }

        tracing::debug!(
            members = self.members.len(),
            "group actor stopped"
        );
    }

    fn handle_add(
        &mut self,
        conn_id: ConnectionId,
        sender: MemberSender<M>,
    ) -> Result<(), GroupError> {
        if self.members.contains_key(&conn_id) {
            return Err(GroupError::AlreadyMember(conn_id));
        }
        self.members.insert(conn_id, sender);
        self.count.store(self.members.len(), Ordering::Release);
        tracing::debug!(%conn_id, members = self.members.len(), "member added");
        Ok(())
    }

    fn handle_remove(&mut self, conn_id: ConnectionId) {
        if self.members.remove(&conn_id).is_some() {
            self.count.store(self.members.len(), Ordering::Release);
            tracing::debug!(
                %conn_id,
                members = self.members.len(),
                "member removed"
            );
        }
    }

    fn handle_broadcast(&self, msg: M) {
        for (conn_id, sender) in &self.members {
            if sender.send(msg.clone()).is_err() {
                // The member's connection is tearing down; its own cleanup
                // path will remove it.
                tracing::debug!(%conn_id, "skipping closed member");
            }
        }
    }
}

/// Spawns a new, empty group actor and returns a handle to it.
pub fn spawn_group<M: Clone + Send + 'static>() -> GroupHandle<M> {
    let (tx, rx) = mpsc::unbounded_channel();
    let count = Arc::new(AtomicUsize::new(0));

    let actor = GroupActor {
        members: HashMap::new(),
        count: Arc::clone(&count),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    GroupHandle {
        sender: tx,
        members: count,
    }
}
