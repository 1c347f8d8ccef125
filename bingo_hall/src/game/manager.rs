//! Registry of live game actors and the routing API client code calls.
//!
//! Actors are spawned lazily: the first action touching a game hydrates
//! it from its durable row and keeps the handle for subsequent callers.
//! A hydrated game resumes accepting actions in whatever status the row
//! recorded; it never replays timers on its own, the next client or
//! admin action drives it forward.

use super::{
    GameState,
    actor::{GameActor, GameHandle},
    errors::{GameError, GameResult},
    messages::GameMessage,
};
use crate::db::models::{GameId, UserId};
use crate::db::repository::GameStore;
use crate::net::{
    messages::ServerEvent,
    rooms::{ConnId, RoomId, Rooms},
};
use crate::wallet::WalletStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};

/// Owns the handles to every live game actor.
pub struct GameManager {
    store: Arc<dyn GameStore>,
    wallet: Arc<dyn WalletStore>,
    rooms: Arc<Rooms>,
    games: RwLock<HashMap<GameId, GameHandle>>,
}

impl GameManager {
    pub fn new(
        store: Arc<dyn GameStore>,
        wallet: Arc<dyn WalletStore>,
        rooms: Arc<Rooms>,
    ) -> Self {
        Self {
            store,
            wallet,
            rooms,
            games: RwLock::new(HashMap::new()),
        }
    }

    pub fn rooms(&self) -> Arc<Rooms> {
        Arc::clone(&self.rooms)
    }

    /// Returns the handle for a game, spawning its actor on first touch.
    async fn ensure_game(&self, game_id: GameId) -> GameResult<GameHandle> {
        {
            let games = self.games.read().await;
            if let Some(handle) = games.get(&game_id) {
                return Ok(handle.clone());
            }
        }

        let record = self
            .store
            .game(game_id)
            .await?
            .ok_or(GameError::GameNotFound)?;
        let lobby = self
            .store
            .lobby(record.lobby_id)
            .await?
            .ok_or(GameError::LobbyNotFound)?;
        let participants = self.store.seats(game_id).await?.len();

        let mut games = self.games.write().await;
        // Someone may have spawned it while we were reading the row.
        if let Some(handle) = games.get(&game_id) {
            return Ok(handle.clone());
        }

        let (actor, handle) = GameActor::new(
            &record,
            lobby.entry_fee,
            participants,
            Arc::clone(&self.store),
            Arc::clone(&self.wallet),
            Arc::clone(&self.rooms),
        );
        tokio::spawn(actor.run());
        games.insert(game_id, handle.clone());

        log::debug!("Spawned actor for game {game_id}");
        Ok(handle)
    }

    /// Claim a seat, debiting the lobby entry fee. The connection is
    /// subscribed to the game's room on success.
    pub async fn claim_seat(
        &self,
        game_id: GameId,
        user_id: UserId,
        seat_number: u8,
        conn: ConnId,
        events: mpsc::Sender<ServerEvent>,
    ) -> GameResult<()> {
        let handle = self.ensure_game(game_id).await?;
        let (response, rx) = oneshot::channel();
        handle
            .send(GameMessage::ClaimSeat {
                user_id,
                seat_number,
                conn,
                events,
                response,
            })
            .await?;
        rx.await.map_err(|_| GameError::SessionUnavailable)?
    }

    /// Mark a called number on the caller's card.
    pub async fn mark_cell(&self, game_id: GameId, user_id: UserId, number: u8) -> GameResult<()> {
        let handle = self.ensure_game(game_id).await?;
        let (response, rx) = oneshot::channel();
        handle
            .send(GameMessage::MarkCell {
                user_id,
                number,
                response,
            })
            .await?;
        rx.await.map_err(|_| GameError::SessionUnavailable)?
    }

    /// Force a round to start regardless of seat count.
    pub async fn admin_start(&self, game_id: GameId) -> GameResult<()> {
        let handle = self.ensure_game(game_id).await?;
        let (response, rx) = oneshot::channel();
        handle.send(GameMessage::AdminStart { response }).await?;
        rx.await.map_err(|_| GameError::SessionUnavailable)?
    }

    /// Change a game's calling interval.
    pub async fn set_interval(&self, game_id: GameId, interval_ms: i64) -> GameResult<()> {
        let handle = self.ensure_game(game_id).await?;
        let (response, rx) = oneshot::channel();
        handle
            .send(GameMessage::SetInterval {
                interval_ms,
                response,
            })
            .await?;
        rx.await.map_err(|_| GameError::SessionUnavailable)?
    }

    /// Subscribe a connection to a game's event room as a spectator.
    pub async fn join_game_room(
        &self,
        game_id: GameId,
        conn: ConnId,
        events: mpsc::Sender<ServerEvent>,
    ) -> GameResult<()> {
        self.ensure_game(game_id).await?;
        self.rooms.join(RoomId::Game(game_id), conn, events).await;
        Ok(())
    }

    /// Snapshot of a game's live projection.
    pub async fn state(&self, game_id: GameId) -> GameResult<GameState> {
        let handle = self.ensure_game(game_id).await?;
        let (response, rx) = oneshot::channel();
        handle.send(GameMessage::GetState { response }).await?;
        rx.await.map_err(|_| GameError::SessionUnavailable)
    }

    /// Number of games with a live actor.
    pub async fn live_game_count(&self) -> usize {
        self.games.read().await.len()
    }
}
