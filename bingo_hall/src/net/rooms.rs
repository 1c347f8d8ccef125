//! Room registry: broadcast groups of connections subscribed to a
//! lobby's or game's events.
//!
//! Each connection owns an outbound channel; broadcasting walks the
//! room's members with `try_send` so one slow client cannot stall a
//! game's actor. Closed receivers are pruned as they are discovered.

use super::messages::ServerEvent;
use crate::db::models::{GameId, LobbyId};
use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Connection ID type
pub type ConnId = Uuid;

/// A broadcast group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomId {
    Lobby(LobbyId),
    Game(GameId),
}

/// Process-wide registry of room memberships.
#[derive(Default)]
pub struct Rooms {
    inner: RwLock<HashMap<RoomId, HashMap<ConnId, mpsc::Sender<ServerEvent>>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Re-joining replaces the previous
    /// sender for that connection.
    pub async fn join(&self, room: RoomId, conn: ConnId, tx: mpsc::Sender<ServerEvent>) {
        let mut inner = self.inner.write().await;
        inner.entry(room).or_default().insert(conn, tx);
    }

    /// Removes a connection from every room it joined.
    pub async fn leave_all(&self, conn: ConnId) {
        let mut inner = self.inner.write().await;
        inner.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    /// Fans an event out to all members of a room.
    pub async fn broadcast(&self, room: RoomId, event: ServerEvent) {
        let mut inner = self.inner.write().await;
        let Some(members) = inner.get_mut(&room) else {
            return;
        };

        members.retain(|conn, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("Connection {conn} outbox full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Connection {conn} gone, removing from room");
                false
            }
        });

        if members.is_empty() {
            inner.remove(&room);
        }
    }

    /// Number of connections currently in a room.
    pub async fn member_count(&self, room: RoomId) -> usize {
        let inner = self.inner.read().await;
        inner.get(&room).map_or(0, HashMap::len)
    }
}
