//! Room registry: which connections are live on which board.
//!
//! DESIGN
//! ======
//! One `RwLock` guards both the board → room map and the reverse
//! connection → board index, so membership changes are atomic and a
//! connection can never sit in two rooms. Rooms are created on first join
//! and removed eagerly when their last member leaves.
//!
//! Each `Connection` holds the sending side of its socket task's outbound
//! queues. The registry never touches sockets directly.

use std::collections::HashMap;
use std::sync::Arc;

use frames::{ConnectionId, CursorPosition, Presence};
use tokio::sync::RwLock;
use tracing::info;

use super::collab::Identity;
use super::outbox::Outbox;
use super::presence::now_ms;

// =============================================================================
// CONNECTION
// =============================================================================

/// One transport session of one participant on one board.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    pub color: String,
    pub board_id: String,
    pub cursor: Option<CursorPosition>,
    pub last_seen: i64,
    outbox: Outbox,
}

impl Connection {
    #[must_use]
    pub fn new(
        id: ConnectionId,
        identity: Identity,
        color: String,
        board_id: String,
        outbox: Outbox,
    ) -> Self {
        Self { id, identity, color, board_id, cursor: None, last_seen: now_ms(), outbox }
    }

    /// Read-only projection sent to clients.
    #[must_use]
    pub fn presence(&self) -> Presence {
        Presence {
            connection_id: self.id,
            user_id: self.identity.user_id.clone(),
            display_name: self.identity.display_name.clone(),
            avatar_url: self.identity.avatar_url.clone(),
            color: self.color.clone(),
            cursor: self.cursor,
            last_seen: self.last_seen,
        }
    }
}

// =============================================================================
// ROOM
// =============================================================================

/// Live members of one board.
#[derive(Debug, Default)]
pub struct Room {
    members: HashMap<ConnectionId, Connection>,
}

impl Room {
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// What a successful leave removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub board_id: String,
    pub connection_id: ConnectionId,
    /// The leaver was the last member; the room no longer exists.
    pub room_closed: bool,
}

/// Result of inserting a connection.
#[derive(Debug)]
pub struct Admission {
    /// Full presence list of the room, including the new member.
    pub presence_list: Vec<Presence>,
    /// Set when the connection had to be removed from another room first.
    pub previous: Option<Departure>,
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug, Default)]
struct RegistryInner {
    rooms: HashMap<String, Room>,
    index: HashMap<ConnectionId, String>,
}

impl RegistryInner {
    fn remove(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let board_id = self.index.remove(&connection_id)?;
        let room = self.rooms.get_mut(&board_id)?;
        room.members.remove(&connection_id)?;

        let room_closed = room.is_empty();
        if room_closed {
            self.rooms.remove(&board_id);
            info!(%board_id, "room closed");
        }
        Some(Departure { board_id, connection_id, room_closed })
    }
}

/// Shared board → members map. Cheap to clone; all clones see the same rooms.
#[derive(Clone, Debug, Default)]
pub struct RoomRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection into its board's room, creating the room if absent.
    /// A connection already present elsewhere is moved, never duplicated.
    pub async fn join(&self, connection: Connection) -> Admission {
        let mut inner = self.inner.write().await;
        let previous = inner.remove(connection.id);

        let connection_id = connection.id;
        let board_id = connection.board_id.clone();
        inner.index.insert(connection_id, board_id.clone());
        let room = inner.rooms.entry(board_id.clone()).or_insert_with(|| {
            info!(%board_id, "room created");
            Room::default()
        });
        room.members.insert(connection_id, connection);

        let presence_list = room.members.values().map(Connection::presence).collect();
        info!(%board_id, %connection_id, members = room.len(), "connection joined room");
        Admission { presence_list, previous }
    }

    /// Remove a connection from whatever room holds it. Returns `None` if it
    /// was not a member, so repeated calls are harmless.
    pub async fn leave(&self, connection_id: ConnectionId) -> Option<Departure> {
        let departure = self.inner.write().await.remove(connection_id)?;
        info!(board_id = %departure.board_id, %connection_id, room_closed = departure.room_closed, "connection left room");
        Some(departure)
    }

    /// Connections currently in a board's room.
    pub async fn members(&self, board_id: &str) -> Vec<ConnectionId> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(board_id)
            .map(|room| room.members.keys().copied().collect())
            .unwrap_or_default()
    }

    pub async fn presence_list(&self, board_id: &str) -> Vec<Presence> {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(board_id)
            .map(|room| room.members.values().map(Connection::presence).collect())
            .unwrap_or_default()
    }

    /// Board the connection currently belongs to.
    pub async fn board_of(&self, connection_id: ConnectionId) -> Option<String> {
        self.inner.read().await.index.get(&connection_id).cloned()
    }

    pub async fn contains_room(&self, board_id: &str) -> bool {
        self.inner.read().await.rooms.contains_key(board_id)
    }

    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    /// Refresh activity for a connection and optionally record its cursor.
    /// Returns the connection's identity snapshot, or `None` if not joined.
    pub async fn touch(&self, connection_id: ConnectionId, cursor: Option<CursorPosition>) -> Option<Connection> {
        let mut inner = self.inner.write().await;
        let board_id = inner.index.get(&connection_id)?.clone();
        let connection = inner.rooms.get_mut(&board_id)?.members.get_mut(&connection_id)?;
        connection.last_seen = now_ms();
        if cursor.is_some() {
            connection.cursor = cursor;
        }
        Some(connection.clone())
    }

    /// Snapshot of member outboxes taken under the read lock, excluding one id.
    pub(crate) async fn recipients(&self, board_id: &str, exclude: Option<ConnectionId>) -> Vec<(ConnectionId, Outbox)> {
        let inner = self.inner.read().await;
        let Some(room) = inner.rooms.get(board_id) else {
            return Vec::new();
        };
        room.members
            .values()
            .filter(|conn| exclude != Some(conn.id))
            .map(|conn| (conn.id, conn.outbox.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
