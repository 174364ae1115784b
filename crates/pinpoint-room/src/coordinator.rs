//! The session coordinator: creates, tracks, and routes to rooms.
//!
//! This is the single entry point for player actions once a connection is
//! authenticated. [`Coordinator::dispatch`] resolves the acting identity
//! and room through the connection registry, forwards the operation to the
//! right room actor, and converts every failure into an `error` unicast to
//! the acting connection — no failure ever escapes to abort a room or
//! touch another player.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pinpoint_protocol::{ClientMessage, PlayerId, RoomId, ServerMessage};
use pinpoint_session::{ConnectionRegistry, SessionError};
use pinpoint_transport::ConnectionId;

use crate::room::spawn_room;
use crate::{
    DispatchError, PersistenceSink, RoomConfig, RoomError, RoomHandle,
    TargetProvider,
};

/// Counter for generating unique room ids. Never reset, so an id is never
/// reused even after its room is evicted.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Process-wide owner of all rooms.
///
/// Not internally synchronized: the server holds it behind one async mutex
/// (room actors themselves run unsynchronized in their own tasks, so the
/// coordinator lock only covers the index and dispatch bookkeeping).
pub struct Coordinator<T: TargetProvider, S: PersistenceSink> {
    rooms: HashMap<RoomId, RoomHandle>,
    registry: Arc<ConnectionRegistry>,
    targets: Arc<T>,
    sink: Arc<S>,
    defaults: RoomConfig,
}

impl<T: TargetProvider, S: PersistenceSink> Coordinator<T, S> {
    /// Creates a coordinator with default room settings.
    pub fn new(registry: Arc<ConnectionRegistry>, targets: T, sink: S) -> Self {
        Self::with_defaults(registry, targets, sink, RoomConfig::default())
    }

    /// Creates a coordinator with custom room defaults (capacity, idle
    /// grace, scoring curve).
    pub fn with_defaults(
        registry: Arc<ConnectionRegistry>,
        targets: T,
        sink: S,
        defaults: RoomConfig,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            registry,
            targets: Arc::new(targets),
            sink: Arc::new(sink),
            defaults,
        }
    }

    /// The shared connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Allocates a new room in the lobby state and returns its id.
    ///
    /// Out-of-range requests are clamped rather than rejected: at least
    /// one round, at least one second per round.
    pub fn create_room(
        &mut self,
        owner: PlayerId,
        total_rounds: u32,
        round_duration: Duration,
    ) -> RoomId {
        let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));

        let mut config = self.defaults.clone();
        config.total_rounds = total_rounds.max(1);
        config.round_duration = round_duration.max(Duration::from_secs(1));

        let handle = spawn_room(
            room_id,
            owner,
            config,
            Arc::clone(&self.registry),
            Arc::clone(&self.targets),
            Arc::clone(&self.sink),
            DEFAULT_CHANNEL_SIZE,
        );
        self.rooms.insert(room_id, handle);
        tracing::info!(%room_id, %owner, total_rounds, "room created");
        room_id
    }

    /// Looks up a room handle.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room never existed or was evicted.
    pub fn room(&self, room_id: RoomId) -> Result<&RoomHandle, RoomError> {
        self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))
    }

    /// Joins the connection's player into a room and attaches the
    /// connection for delivery. A second connection for the same player
    /// in the same room replaces the first (reconnect).
    pub async fn join_room(
        &self,
        conn: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), DispatchError> {
        let identity = self
            .registry
            .identity(conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let player_id = identity.player_id;

        let handle = self.room(room_id)?;
        handle.join(player_id, identity.display_name, conn).await?;

        if let Err(e) = self.registry.attach(conn, room_id) {
            // The connection died between join and attach. Undo the
            // binding so the room doesn't hold a dead connection id.
            let _ = handle.disconnect(player_id, conn).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Routes one inbound message from an authenticated connection.
    ///
    /// This is the recovery boundary of the whole system: any error
    /// becomes an `error` message unicast back to the sender.
    pub async fn dispatch(&mut self, conn: ConnectionId, msg: ClientMessage) {
        if let Err(e) = self.dispatch_inner(conn, msg).await {
            tracing::debug!(%conn, error = %e, "action rejected");
            self.registry.unicast(
                conn,
                ServerMessage::Error {
                    code: e.code(),
                    message: e.to_string(),
                },
            );
        }
    }

    async fn dispatch_inner(
        &mut self,
        conn: ConnectionId,
        msg: ClientMessage,
    ) -> Result<(), DispatchError> {
        match msg {
            // Connection-level traffic is answered by the handler before
            // it reaches the coordinator; arriving here is harmless noise.
            ClientMessage::Authenticate { .. } | ClientMessage::Heartbeat { .. } => {
                tracing::debug!(%conn, "connection-level message reached dispatch, ignoring");
                Ok(())
            }

            ClientMessage::CreateRoom {
                total_rounds,
                duration_seconds,
            } => {
                let identity = self
                    .registry
                    .identity(conn)
                    .ok_or(SessionError::UnknownConnection(conn))?;
                let room_id = self.create_room(
                    identity.player_id,
                    total_rounds,
                    Duration::from_secs(duration_seconds),
                );
                self.registry
                    .unicast(conn, ServerMessage::RoomCreated { room_id });
                Ok(())
            }

            ClientMessage::JoinRoom { room_id } => {
                self.join_room(conn, room_id).await?;
                self.registry
                    .unicast(conn, ServerMessage::RoomJoined { room_id });
                Ok(())
            }

            ClientMessage::StartRound => {
                let (player_id, handle) = self.acting_room(conn)?;
                handle.start_round(player_id).await?;
                Ok(())
            }

            ClientMessage::SubmitGuess { lat, lng } => {
                let (player_id, handle) = self.acting_room(conn)?;
                handle.submit_guess(player_id, conn, lat, lng).await?;
                Ok(())
            }

            ClientMessage::EndGame => {
                let (player_id, handle) = self.acting_room(conn)?;
                handle.end_game(player_id).await?;
                Ok(())
            }
        }
    }

    /// Resolves the acting player and their current room for in-room
    /// operations.
    fn acting_room(
        &self,
        conn: ConnectionId,
    ) -> Result<(PlayerId, RoomHandle), DispatchError> {
        let identity = self
            .registry
            .identity(conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let room_id = self
            .registry
            .room_of(conn)
            .ok_or(RoomError::NoRoomJoined(identity.player_id))?;
        let handle = self
            .rooms
            .get(&room_id)
            .ok_or(RoomError::NotFound(room_id))?
            .clone();
        Ok((identity.player_id, handle))
    }

    /// Tears down a closed connection: removes it from the registry and
    /// tells its room (if any) so the player's connection slot clears.
    pub async fn connection_closed(&self, conn: ConnectionId) {
        if let Some((player_id, Some(room_id))) = self.registry.deregister(conn) {
            if let Some(handle) = self.rooms.get(&room_id) {
                let _ = handle.disconnect(player_id, conn).await;
            }
        }
    }

    /// Periodic sweep removing rooms that are finished with nobody
    /// connected, or idle (zero connections) past their grace period.
    /// Returns the evicted room ids.
    pub async fn evict_idle_rooms(&mut self) -> Vec<RoomId> {
        let mut evicted = Vec::new();
        for (room_id, handle) in &self.rooms {
            match handle.info().await {
                Ok(info) => {
                    let finished_and_empty =
                        info.status.is_finished() && info.connected_count == 0;
                    if finished_and_empty || info.idle_expired {
                        evicted.push(*room_id);
                    }
                }
                // Actor already gone; drop the stale handle.
                Err(_) => evicted.push(*room_id),
            }
        }

        for room_id in &evicted {
            if let Some(handle) = self.rooms.remove(room_id) {
                let _ = handle.shutdown().await;
                tracing::info!(room_id = %room_id, "idle room evicted");
            }
        }
        evicted
    }

    /// Shuts down and removes one room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no such room.
    pub async fn destroy_room(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Ids of all live rooms.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }
}
