//! Per-connection handler: authentication, the writer pump, and the read
//! loop.
//!
//! Each accepted connection gets its own task running [`handle_connection`]:
//!
//! 1. The first message must be `authenticate` — the token goes to the
//!    [`Authenticator`], and failure closes the connection.
//! 2. The connection is registered with an outbound channel, and a writer
//!    task starts draining that channel onto the socket. Room actors only
//!    ever enqueue; this task is the one that touches the network.
//! 3. The read loop decodes inbound messages: heartbeats are answered
//!    here, everything else goes through `Coordinator::dispatch`.
//!
//! A drop guard deregisters the connection and notifies its room on every
//! exit path, including panics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pinpoint_protocol::{
    ClientMessage, Codec, ErrorCode, ProtocolError, ServerMessage,
};
use pinpoint_room::{PersistenceSink, TargetProvider};
use pinpoint_session::{Authenticator, Identity};
use pinpoint_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::PinpointError;
use crate::server::ServerState;

/// How long a client gets to send its `authenticate` message.
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// A connection with no inbound traffic (not even heartbeats) for this
/// long is presumed dead and dropped.
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Drop guard that tears down a connection's registrations when the
/// handler exits. `Drop` is synchronous, so the async cleanup runs on a
/// spawned task.
struct ConnectionGuard<T, S, A, C>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec,
{
    conn_id: ConnectionId,
    state: Arc<ServerState<T, S, A, C>>,
}

impl<T, S, A, C> Drop for ConnectionGuard<T, S, A, C>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec,
{
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let coordinator = state.coordinator.lock().await;
            coordinator.connection_closed(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<T, S, A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<T, S, A, C>>,
) -> Result<(), PinpointError>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    let started = Instant::now();
    tracing::debug!(%conn_id, "handling new connection");

    let identity = authenticate(&conn, &state).await?;
    tracing::info!(%conn_id, player_id = %identity.player_id, "connection authenticated");

    let conn = Arc::new(conn);
    let (outbound_tx, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    state.registry.register(conn_id, identity.clone(), outbound_tx);
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    spawn_writer(Arc::clone(&conn), outbound_rx, state.codec.clone());

    state.registry.unicast(
        conn_id,
        ServerMessage::Authenticated {
            player_id: identity.player_id,
            display_name: identity.display_name,
        },
    );

    read_loop(&conn, conn_id, &state, started).await
    // _guard drops here: deregister + room disconnect.
}

/// Receives the first message, requires it to be `authenticate`, and
/// resolves the token through the authenticator.
async fn authenticate<T, S, A, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<T, S, A, C>>,
) -> Result<Identity, PinpointError>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(AUTH_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before authenticating".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage(
                "authentication timed out".into(),
            )
            .into());
        }
    };

    let msg: ClientMessage = state.codec.decode(&data)?;
    let ClientMessage::Authenticate { token } = msg else {
        send_error(conn, &state.codec, "authenticate first").await?;
        return Err(ProtocolError::InvalidMessage(
            "first message must be authenticate".into(),
        )
        .into());
    };

    match state.auth.authenticate(&token).await {
        Ok(identity) => Ok(identity),
        Err(e) => {
            send_error(conn, &state.codec, &e.to_string()).await?;
            Err(e.into())
        }
    }
}

/// Starts the writer task: drains the outbound channel onto the socket.
/// Ends when the channel closes (deregistration) or a send fails, and
/// closes the socket on the way out.
fn spawn_writer<C: Codec + Clone>(
    conn: Arc<WebSocketConnection>,
    mut outbound: tokio::sync::mpsc::UnboundedReceiver<ServerMessage>,
    codec: C,
) {
    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let bytes = match codec.encode(&msg) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode outbound message");
                    continue;
                }
            };
            if conn.send(&bytes).await.is_err() {
                break;
            }
        }
        let _ = conn.close().await;
    });
}

/// The main inbound loop for an authenticated connection.
async fn read_loop<T, S, A, C>(
    conn: &WebSocketConnection,
    conn_id: ConnectionId,
    state: &Arc<ServerState<T, S, A, C>>,
    started: Instant,
) -> Result<(), PinpointError>
where
    T: TargetProvider,
    S: PersistenceSink,
    A: Authenticator,
    C: Codec,
{
    loop {
        let data = match tokio::time::timeout(READ_IDLE_TIMEOUT, conn.recv()).await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, dropping");
                return Ok(());
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "undecodable message, ignoring");
                continue;
            }
        };

        match msg {
            ClientMessage::Heartbeat { client_time } => {
                state.registry.unicast(
                    conn_id,
                    ServerMessage::HeartbeatAck {
                        client_time,
                        server_time: started.elapsed().as_millis() as u64,
                    },
                );
            }
            ClientMessage::Authenticate { .. } => {
                tracing::debug!(%conn_id, "already authenticated, ignoring");
            }
            other => {
                // PERF: one coordinator lock per message. Fine at this
                // scale; cache the room handle per connection if dispatch
                // ever shows up in profiles.
                state.coordinator.lock().await.dispatch(conn_id, other).await;
            }
        }
    }
}

/// Sends an `error` message directly on the socket. Used before the
/// connection is registered (the registry can't reach it yet).
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: &str,
) -> Result<(), PinpointError> {
    let bytes = codec.encode(&ServerMessage::Error {
        code: ErrorCode::Unauthenticated,
        message: message.to_string(),
    })?;
    conn.send(&bytes).await.map_err(PinpointError::Transport)
}
