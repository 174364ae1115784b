//! The connection registry: who is connected, where, and how to reach them.
//!
//! Delivery is decoupled from room logic by a per-connection unbounded
//! channel. Room actors enqueue outbound messages here and move on; a
//! writer task per connection drains the channel onto the socket. Slow or
//! dead clients therefore never stall a room's command loop.
//!
//! All operations are short, synchronous map updates under one mutex. The
//! lock is never held across an await, so it cannot participate in a
//! deadlock with the async layers above.

use std::collections::HashMap;
use std::sync::Mutex;

use pinpoint_protocol::{PlayerId, RoomId, ServerMessage};
use pinpoint_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::{Identity, SessionError};

/// Channel end the registry pushes outbound messages into. The receiving
/// half belongs to that connection's writer task.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

struct ConnectionEntry {
    identity: Identity,
    room: Option<RoomId>,
    sender: OutboundSender,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// Index for reconnect-by-replacement: at most one connection per
    /// (player, room) pair. Kept in sync with `connections`.
    members: HashMap<(PlayerId, RoomId), ConnectionId>,
}

/// Registry of live connections, shared by the server and all room actors.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<Inner>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an authenticated connection and its outbound channel.
    /// No room membership is implied yet.
    pub fn register(
        &self,
        conn: ConnectionId,
        identity: Identity,
        sender: OutboundSender,
    ) {
        let mut inner = self.lock();
        tracing::debug!(%conn, player_id = %identity.player_id, "connection registered");
        inner.connections.insert(
            conn,
            ConnectionEntry {
                identity,
                room: None,
                sender,
            },
        );
    }

    /// Returns the identity bound to a connection.
    pub fn identity(&self, conn: ConnectionId) -> Option<Identity> {
        self.lock()
            .connections
            .get(&conn)
            .map(|e| e.identity.clone())
    }

    /// Returns the room a connection is currently attached to.
    pub fn room_of(&self, conn: ConnectionId) -> Option<RoomId> {
        self.lock().connections.get(&conn).and_then(|e| e.room)
    }

    /// Attaches a connection to a room.
    ///
    /// If the same player already had a connection in that room, the old
    /// one is removed (its outbound channel closes, which ends its writer
    /// task) and returned so the caller can log or close the socket. This
    /// is the whole reconnect story: the player's in-room state is
    /// untouched, only the delivery path changes.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] if `conn` was never registered
    /// or already deregistered.
    pub fn attach(
        &self,
        conn: ConnectionId,
        room: RoomId,
    ) -> Result<Option<ConnectionId>, SessionError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let entry = inner
            .connections
            .get_mut(&conn)
            .ok_or(SessionError::UnknownConnection(conn))?;
        let player = entry.identity.player_id;

        // Moving between rooms drops the old membership mapping.
        if let Some(previous_room) = entry.room.replace(room) {
            if previous_room != room {
                inner.members.remove(&(player, previous_room));
            }
        }

        let replaced = inner.members.insert((player, room), conn);
        let replaced = replaced.filter(|old| *old != conn);
        if let Some(old) = replaced {
            inner.connections.remove(&old);
            tracing::info!(
                %player, %room, old_conn = %old, new_conn = %conn,
                "connection replaced by reconnect"
            );
        }

        Ok(replaced)
    }

    /// Removes a connection. The player (if any) stays in their room;
    /// they just stop receiving until they reconnect.
    ///
    /// Returns the identity and room the connection was bound to, so the
    /// caller can tell the room actor about the disconnect.
    pub fn deregister(
        &self,
        conn: ConnectionId,
    ) -> Option<(PlayerId, Option<RoomId>)> {
        let mut inner = self.lock();
        let entry = inner.connections.remove(&conn)?;
        let player = entry.identity.player_id;
        if let Some(room) = entry.room {
            // Only clear the membership slot if it still points at us; a
            // reconnect may already have claimed it.
            if inner.members.get(&(player, room)) == Some(&conn) {
                inner.members.remove(&(player, room));
            }
        }
        tracing::debug!(%conn, %player, "connection deregistered");
        Some((player, entry.room))
    }

    /// Delivers `message` to every connection attached to `room`, except
    /// an optional excluded one.
    ///
    /// Best-effort per connection: a dead channel gets that connection
    /// deregistered and delivery continues to the rest.
    pub fn broadcast(
        &self,
        room: RoomId,
        message: &ServerMessage,
        exclude: Option<ConnectionId>,
    ) {
        let mut inner = self.lock();
        let mut dead = Vec::new();
        for (conn, entry) in &inner.connections {
            if entry.room != Some(room) || Some(*conn) == exclude {
                continue;
            }
            if entry.sender.send(message.clone()).is_err() {
                dead.push(*conn);
            }
        }
        for conn in dead {
            tracing::debug!(%conn, %room, "dropping dead connection during broadcast");
            Self::remove_locked(&mut inner, conn);
        }
    }

    /// Delivers `message` to exactly one connection. Returns `false` (and
    /// deregisters the connection) if delivery failed.
    pub fn unicast(&self, conn: ConnectionId, message: ServerMessage) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.connections.get(&conn) else {
            return false;
        };
        if entry.sender.send(message).is_err() {
            tracing::debug!(%conn, "dropping dead connection during unicast");
            Self::remove_locked(&mut inner, conn);
            return false;
        }
        true
    }

    /// Number of live connections attached to a room.
    pub fn connected_count(&self, room: RoomId) -> usize {
        self.lock()
            .connections
            .values()
            .filter(|e| e.room == Some(room))
            .count()
    }

    fn remove_locked(inner: &mut Inner, conn: ConnectionId) {
        if let Some(entry) = inner.connections.remove(&conn) {
            if let Some(room) = entry.room {
                let key = (entry.identity.player_id, room);
                if inner.members.get(&key) == Some(&conn) {
                    inner.members.remove(&key);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning would mean a panic while holding the lock; every
        // critical section here is panic-free map manipulation.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// =========================================================================
// Tests
// =========================================================================
