//! Per-connection handler: entry path, relay loop, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive the `init` frame → decide the entry path
//!   2. start: create a session, send `init` back, relay moves as red
//!      join:  resolve the join token, claim the seat, relay moves as yellow
//!      watch: resolve the watch token, replay history, wait for close
//!   3. On exit: leave the connection group; a creator also releases the
//!      join token, a second player frees its seat
//!
//! Every frame for this connection, direct or broadcast, goes through one
//! outbound queue drained by a writer task, so the client sees frames in
//! the order they were issued.

use std::sync::Arc;

use fourplay_engine::{Move, PlayError};
use fourplay_protocol::{Codec, MoveRequest, Player, ProtocolError, Request, ServerEvent};
use fourplay_session::{Frame, Role, Session};
use fourplay_transport::{Connection, ConnectionId, Incoming, PendingWebSocket, WebSocketConnection};
use tokio::sync::{mpsc, watch};

use crate::server::ServerState;
use crate::FourplayError;

type Outbound = mpsc::UnboundedSender<Frame>;

/// Drop guard that detaches a connection from its session when the handler
/// exits, whether it returns normally, with an error, or by panic.
struct AttachGuard<C: Codec> {
    conn_id: ConnectionId,
    role: Role,
    session: Arc<Session>,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for AttachGuard<C> {
    fn drop(&mut self) {
        let _ = self.session.group().remove(self.conn_id);
        match self.role {
            Role::FirstPlayer => {
                self.state
                    .registry()
                    .release_join(self.session.join_token());
            }
            Role::SecondPlayer => self.session.release_second_seat(),
            Role::Spectator => {}
        }
        tracing::info!(
            conn_id = %self.conn_id,
            session = %self.session.id(),
            role = %self.role,
            "connection detached"
        );
    }
}

/// Handles a single connection from accept to close.
///
/// The WebSocket upgrade runs here, in the connection's own task, so a
/// peer that stalls mid-handshake only stalls itself.
pub(crate) async fn handle_connection<C: Codec>(
    pending: PendingWebSocket,
    state: Arc<ServerState<C>>,
) -> Result<(), FourplayError> {
    let conn = Arc::new(pending.establish().await?);
    tracing::debug!(conn_id = %conn.id(), "handling new connection");

    let result = serve(&conn, &state).await;

    // Errors here mean the peer is already gone.
    let _ = conn.close().await;
    result
}

async fn serve<C: Codec>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<C>>,
) -> Result<(), FourplayError> {
    let request = read_request(conn, state).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_frames(Arc::clone(conn), rx));

    let result = match request {
        Request::Start => start(conn, state, tx).await,
        Request::Join { token } => join(conn, state, tx, &token).await,
        Request::Watch { token } => watch(conn, state, tx, &token).await,
    };

    // Every sender is gone once the group has processed our removal, so
    // the writer flushes what is queued and stops.
    let _ = writer.await;
    result
}

/// Waits for the first frame and decodes it into a [`Request`].
async fn read_request<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
) -> Result<Request, FourplayError> {
    let data = match tokio::time::timeout(state.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before init".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("init timed out".into()).into());
        }
    };

    let msg = state.validation.decode_client(&state.codec, &data)?;
    Ok(Request::try_from(msg)?)
}

/// Creates a new session and plays it as the first player.
async fn start<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    tx: Outbound,
) -> Result<(), FourplayError> {
    let conn_id = conn.id();
    let session = state.registry().create();
    let _guard = AttachGuard {
        conn_id,
        role: Role::FirstPlayer,
        session: Arc::clone(&session),
        state: Arc::clone(state),
    };

    send(
        &tx,
        &state.codec,
        &ServerEvent::Init {
            join: session.join_token().to_string(),
            watch: session.watch_token().to_string(),
        },
    )?;
    session.group().add(conn_id, tx.clone()).await?;

    tracing::info!(%conn_id, session = %session.id(), "first player started game");
    relay(conn, state, &session, Player::Red, &tx).await
}

/// Attaches a second player to an existing session.
async fn join<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    tx: Outbound,
    token: &str,
) -> Result<(), FourplayError> {
    let conn_id = conn.id();
    let (resolved, policy) = {
        let registry = state.registry();
        (registry.resolve_join(token), registry.config().join_policy)
    };

    let session = match resolved.and_then(|s| s.claim_second_seat(policy).map(|()| s)) {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(%conn_id, reason = %e, "join refused");
            return send(&tx, &state.codec, &ServerEvent::error(e.to_string()));
        }
    };

    session.group().add(conn_id, tx.clone()).await?;
    let _guard = AttachGuard {
        conn_id,
        role: Role::SecondPlayer,
        session: Arc::clone(&session),
        state: Arc::clone(state),
    };

    tracing::info!(%conn_id, session = %session.id(), "second player joined game");
    relay(conn, state, &session, Player::Yellow, &tx).await
}

/// Attaches a spectator: replays history, then waits for the connection to
/// close while live events arrive through the group.
async fn watch<C: Codec>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<C>>,
    tx: Outbound,
    token: &str,
) -> Result<(), FourplayError> {
    let conn_id = conn.id();
    let resolved = state.registry().resolve_watch(token);

    let session = match resolved {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(%conn_id, reason = %e, "watch refused");
            return send(&tx, &state.codec, &ServerEvent::error(e.to_string()));
        }
    };

    // Under the engine lock no move can be played, so the history copied
    // here and the moment we join the group line up exactly: every move
    // is either in the replay or in a later broadcast, never both.
    let replayed = {
        let engine = session.engine().lock().await;
        for m in engine.moves() {
            send(&tx, &state.codec, &play_event(m))?;
        }
        session.group().add(conn_id, tx.clone()).await?;
        engine.moves().len()
    };
    let _guard = AttachGuard {
        conn_id,
        role: Role::Spectator,
        session: Arc::clone(&session),
        state: Arc::clone(state),
    };

    tracing::info!(%conn_id, session = %session.id(), replayed, "spectator joined game");

    let mut shutdown = state.shutdown.clone();
    loop {
        let data = tokio::select! {
            received = conn.recv() => received?,
            () = stopped(&mut shutdown) => None,
        };
        if data.is_none() {
            return Ok(());
        }
        tracing::debug!(%conn_id, "ignoring frame from spectator");
    }
}

/// Receives move requests from a player until the connection closes.
///
/// Rejected moves are answered with an `error` event to this connection
/// only. Accepted moves are broadcast to the whole group as `play`, or as
/// `win` when the move ends the game.
async fn relay<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    session: &Session,
    player: Player,
    tx: &Outbound,
) -> Result<(), FourplayError> {
    let conn_id = conn.id();
    let mut shutdown = state.shutdown.clone();

    loop {
        let data = tokio::select! {
            received = conn.recv() => received?,
            () = stopped(&mut shutdown) => None,
        };
        let Some(data) = data else {
            tracing::info!(%conn_id, %player, "player disconnected");
            return Ok(());
        };

        let msg = state.validation.decode_client(&state.codec, &data)?;
        let MoveRequest { column } = MoveRequest::try_from(msg)?;

        // The lock stays held until the broadcast is queued, so broadcasts
        // leave in the same order the engine accepted the moves.
        let mut engine = session.engine().lock().await;
        // A negative column is as far off the board as one past the edge.
        let outcome = usize::try_from(column)
            .map_err(|_| PlayError::ColumnOutOfRange)
            .and_then(|column| engine.play(player, column).map(|row| (column, row)));
        match outcome {
            Ok((column, row)) => {
                let event = match engine.winner() {
                    Some(winner) => {
                        tracing::info!(session = %session.id(), %winner, "game won");
                        ServerEvent::Win { player: winner }
                    }
                    None => ServerEvent::Play {
                        player,
                        column,
                        row,
                    },
                };
                let frame: Frame = state.codec.encode(&event)?.into();
                session.group().broadcast(frame)?;
            }
            Err(e) => {
                drop(engine);
                tracing::debug!(%conn_id, %player, column, reason = %e, "move rejected");
                send(tx, &state.codec, &ServerEvent::error(e.to_string()))?;
            }
        }
    }
}

/// Drains the outbound queue into the socket.
///
/// A failed send means the peer is gone: stop and let the receive side
/// notice the close.
async fn write_frames(conn: Arc<WebSocketConnection>, mut rx: mpsc::UnboundedReceiver<Frame>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed");
            break;
        }
    }
}

/// Resolves once the server starts shutting down, or if the server is
/// gone altogether.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Encodes `event` and queues it for this connection only.
fn send(tx: &Outbound, codec: &impl Codec, event: &ServerEvent) -> Result<(), FourplayError> {
    let frame: Frame = codec.encode(event)?.into();
    // A closed queue means the writer already stopped; nothing to report.
    let _ = tx.send(frame);
    Ok(())
}

fn play_event(m: &Move) -> ServerEvent {
    ServerEvent::Play {
        player: m.player,
        column: m.column,
        row: m.row,
    }
}
