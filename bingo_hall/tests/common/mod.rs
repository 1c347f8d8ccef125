//! In-memory store used by the engine integration tests.
//!
//! Implements both storage seams over a plain mutex so timer-driven
//! tests run on a paused clock without a database.

#![allow(dead_code)]

use async_trait::async_trait;
use bingo_hall::db::models::{
    GameId, GameRecord, GameView, Lobby, LobbyId, LobbyView, SeatId, SeatRecord, SeatView, UserId,
    UserRecord,
};
use bingo_hall::db::repository::{GameStore, StoreResult};
use bingo_hall::card::BingoCard;
use bingo_hall::game::GameStatus;
use bingo_hall::wallet::{WalletError, WalletResult, WalletStore};
use bingo_hall::{DEFAULT_CALL_INTERVAL_MS, GAMES_PER_LOBBY};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    lobbies: HashMap<LobbyId, Lobby>,
    games: HashMap<GameId, GameRecord>,
    seats: HashMap<SeatId, SeatRecord>,
    users: HashMap<UserId, UserRecord>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn sorted_seats(&self, game_id: GameId) -> Vec<SeatRecord> {
        let mut seats: Vec<SeatRecord> = self
            .seats
            .values()
            .filter(|s| s.game_id == game_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| s.seat_number);
        seats
    }

    fn seat_views(&self, game_id: GameId) -> Vec<SeatView> {
        self.sorted_seats(game_id)
            .into_iter()
            .filter_map(|seat| {
                let user = self.users.get(&seat.user_id)?.clone();
                Some(SeatView { seat, user })
            })
            .collect()
    }

    fn game_view(&self, game_id: GameId) -> Option<GameView> {
        let game = self.games.get(&game_id)?.clone();
        let seats = self.seat_views(game_id);
        Some(GameView { game, seats })
    }

    fn lobby_view(&self, lobby_id: LobbyId) -> Option<LobbyView> {
        let lobby = self.lobbies.get(&lobby_id)?.clone();
        let mut games: Vec<GameView> = self
            .games
            .values()
            .filter(|g| g.lobby_id == lobby_id)
            .filter_map(|g| self.game_view(g.id))
            .collect();
        games.sort_by_key(|v| v.game.game_number);
        Some(LobbyView { lobby, games })
    }
}

/// In-memory implementation of the game and wallet stores.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Fixture helpers below are synchronous; tests use them to seed and
    // inspect state without going through the async seams.

    pub fn add_user(&self, username: &str, balance: i64) -> UserRecord {
        let mut inner = self.inner.lock().unwrap();
        let user = UserRecord {
            id: inner.next_id(),
            username: username.to_string(),
            balance,
        };
        inner.users.insert(user.id, user.clone());
        user
    }

    pub fn balance_of(&self, user_id: UserId) -> i64 {
        self.inner.lock().unwrap().users[&user_id].balance
    }

    pub fn game_record(&self, game_id: GameId) -> GameRecord {
        self.inner.lock().unwrap().games[&game_id].clone()
    }

    pub fn seat_count(&self, game_id: GameId) -> usize {
        self.inner.lock().unwrap().sorted_seats(game_id).len()
    }

    pub fn marked_cells(&self, game_id: GameId, user_id: UserId) -> Vec<u8> {
        self.inner
            .lock()
            .unwrap()
            .sorted_seats(game_id)
            .into_iter()
            .find(|s| s.user_id == user_id)
            .map(|s| s.marked_cells)
            .unwrap_or_default()
    }

    /// Overwrites a game row, for hydrating games mid-lifecycle.
    pub fn with_game_mut(&self, game_id: GameId, f: impl FnOnce(&mut GameRecord)) {
        let mut inner = self.inner.lock().unwrap();
        let game = inner.games.get_mut(&game_id).unwrap();
        f(game);
    }

    pub fn insert_seat(&self, game_id: GameId, user_id: UserId, seat_number: i16) -> SeatRecord {
        let mut inner = self.inner.lock().unwrap();
        let seat = SeatRecord {
            id: inner.next_id(),
            game_id,
            user_id,
            seat_number,
            marked_cells: Vec::new(),
        };
        inner.seats.insert(seat.id, seat.clone());
        seat
    }
}

#[async_trait]
impl GameStore for MemStore {
    async fn lobby(&self, id: LobbyId) -> StoreResult<Option<Lobby>> {
        Ok(self.inner.lock().unwrap().lobbies.get(&id).cloned())
    }

    async fn lobby_view(&self, id: LobbyId) -> StoreResult<Option<LobbyView>> {
        Ok(self.inner.lock().unwrap().lobby_view(id))
    }

    async fn list_lobbies(&self) -> StoreResult<Vec<LobbyView>> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<LobbyId> = inner.lobbies.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids.into_iter().filter_map(|id| inner.lobby_view(id)).collect())
    }

    async fn create_lobby(&self, entry_fee: i64) -> StoreResult<LobbyView> {
        let mut inner = self.inner.lock().unwrap();
        let lobby = Lobby {
            id: inner.next_id(),
            entry_fee,
            created_at: Utc::now(),
        };
        inner.lobbies.insert(lobby.id, lobby.clone());

        for game_number in 1..=GAMES_PER_LOBBY as i32 {
            let game = GameRecord {
                id: inner.next_id(),
                lobby_id: lobby.id,
                game_number,
                status: GameStatus::Waiting,
                master_card: None,
                seed: None,
                called_numbers: Vec::new(),
                prize_pool: 0,
                winner_id: None,
                start_time: None,
                interval_ms: DEFAULT_CALL_INTERVAL_MS,
            };
            inner.games.insert(game.id, game);
        }

        Ok(inner.lobby_view(lobby.id).unwrap())
    }

    async fn game(&self, id: GameId) -> StoreResult<Option<GameRecord>> {
        Ok(self.inner.lock().unwrap().games.get(&id).cloned())
    }

    async fn game_view(&self, id: GameId) -> StoreResult<Option<GameView>> {
        Ok(self.inner.lock().unwrap().game_view(id))
    }

    async fn seats(&self, game_id: GameId) -> StoreResult<Vec<SeatRecord>> {
        Ok(self.inner.lock().unwrap().sorted_seats(game_id))
    }

    async fn seat_for_user(
        &self,
        game_id: GameId,
        user_id: UserId,
    ) -> StoreResult<Option<SeatRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sorted_seats(game_id)
            .into_iter()
            .find(|s| s.user_id == user_id))
    }

    async fn create_seat(
        &self,
        game_id: GameId,
        user_id: UserId,
        seat_number: i16,
    ) -> StoreResult<SeatRecord> {
        Ok(self.insert_seat(game_id, user_id, seat_number))
    }

    async fn delete_seats(&self, game_id: GameId) -> StoreResult<()> {
        self.inner
            .lock()
            .unwrap()
            .seats
            .retain(|_, s| s.game_id != game_id);
        Ok(())
    }

    async fn set_marked_cells(&self, seat_id: SeatId, marked: &[u8]) -> StoreResult<()> {
        if let Some(seat) = self.inner.lock().unwrap().seats.get_mut(&seat_id) {
            seat.marked_cells = marked.to_vec();
        }
        Ok(())
    }

    async fn update_status(&self, game_id: GameId, status: GameStatus) -> StoreResult<()> {
        if let Some(game) = self.inner.lock().unwrap().games.get_mut(&game_id) {
            game.status = status;
        }
        Ok(())
    }

    async fn record_round_start(
        &self,
        game_id: GameId,
        seed: i64,
        master_card: &BingoCard,
        prize_pool: i64,
        start_time: DateTime<Utc>,
    ) -> StoreResult<()> {
        if let Some(game) = self.inner.lock().unwrap().games.get_mut(&game_id) {
            game.status = GameStatus::Active;
            game.seed = Some(seed);
            game.master_card = Some(master_card.clone());
            game.prize_pool = prize_pool;
            game.start_time = Some(start_time);
            game.called_numbers.clear();
            game.winner_id = None;
        }
        Ok(())
    }

    async fn record_called_numbers(&self, game_id: GameId, called: &[u8]) -> StoreResult<()> {
        if let Some(game) = self.inner.lock().unwrap().games.get_mut(&game_id) {
            game.called_numbers = called.to_vec();
        }
        Ok(())
    }

    async fn record_interval(&self, game_id: GameId, interval_ms: i64) -> StoreResult<()> {
        if let Some(game) = self.inner.lock().unwrap().games.get_mut(&game_id) {
            game.interval_ms = interval_ms;
        }
        Ok(())
    }

    async fn record_winner(&self, game_id: GameId, winner_id: Option<UserId>) -> StoreResult<()> {
        if let Some(game) = self.inner.lock().unwrap().games.get_mut(&game_id) {
            game.status = GameStatus::Finished;
            game.winner_id = winner_id;
        }
        Ok(())
    }

    async fn reset_game(&self, game_id: GameId) -> StoreResult<()> {
        if let Some(game) = self.inner.lock().unwrap().games.get_mut(&game_id) {
            game.status = GameStatus::Waiting;
            game.master_card = None;
            game.seed = None;
            game.called_numbers.clear();
            game.prize_pool = 0;
            game.winner_id = None;
            game.start_time = None;
        }
        Ok(())
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, username: &str, balance: i64) -> StoreResult<UserRecord> {
        Ok(self.add_user(username, balance))
    }
}

#[async_trait]
impl WalletStore for MemStore {
    async fn debit(&self, user_id: UserId, amount: i64) -> WalletResult<i64> {
        if amount < 0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(WalletError::UserNotFound(user_id))?;
        if user.balance < amount {
            return Err(WalletError::InsufficientBalance {
                available: user.balance,
                required: amount,
            });
        }
        user.balance -= amount;
        Ok(user.balance)
    }

    async fn credit(&self, user_id: UserId, amount: i64) -> WalletResult<i64> {
        if amount < 0 {
            return Err(WalletError::InvalidAmount(amount));
        }
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(WalletError::UserNotFound(user_id))?;
        user.balance += amount;
        Ok(user.balance)
    }

    async fn balance(&self, user_id: UserId) -> WalletResult<i64> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .get(&user_id)
            .map(|u| u.balance)
            .ok_or(WalletError::UserNotFound(user_id))
    }
}
