//! Storage seam for the game engine and its PostgreSQL implementation.
//!
//! The engine talks to [`GameStore`] only; [`PgStore`] is the production
//! implementation. Tests supply an in-memory store behind the same
//! trait, which keeps the timer-driven integration tests free of a live
//! database.

use super::models::{
    GameId, GameRecord, GameView, Lobby, LobbyId, LobbyView, SeatId, SeatRecord, SeatView, UserId,
    UserRecord, decode_numbers, encode_numbers,
};
use crate::card::BingoCard;
use crate::game::{GameStatus, constants::GAMES_PER_LOBBY};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Master card column could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable records behind the engine: lobbies, games, seats, users.
///
/// Seat listings come back ordered by seat number; the winner sweep
/// relies on that ordering to break ties toward the lowest seat.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn lobby(&self, id: LobbyId) -> StoreResult<Option<Lobby>>;

    /// Lobby snapshot with nested games and seats.
    async fn lobby_view(&self, id: LobbyId) -> StoreResult<Option<LobbyView>>;

    async fn list_lobbies(&self) -> StoreResult<Vec<LobbyView>>;

    /// Creates a lobby together with its fixed set of 4 waiting games.
    async fn create_lobby(&self, entry_fee: i64) -> StoreResult<LobbyView>;

    async fn game(&self, id: GameId) -> StoreResult<Option<GameRecord>>;

    /// Game with seat/user details, the `game-updated` payload.
    async fn game_view(&self, id: GameId) -> StoreResult<Option<GameView>>;

    /// Seats of a game, ordered by seat number.
    async fn seats(&self, game_id: GameId) -> StoreResult<Vec<SeatRecord>>;

    async fn seat_for_user(
        &self,
        game_id: GameId,
        user_id: UserId,
    ) -> StoreResult<Option<SeatRecord>>;

    async fn create_seat(
        &self,
        game_id: GameId,
        user_id: UserId,
        seat_number: i16,
    ) -> StoreResult<SeatRecord>;

    async fn delete_seats(&self, game_id: GameId) -> StoreResult<()>;

    async fn set_marked_cells(&self, seat_id: SeatId, marked: &[u8]) -> StoreResult<()>;

    async fn update_status(&self, game_id: GameId, status: GameStatus) -> StoreResult<()>;

    /// Checkpoints a round start: active status, seed, master card,
    /// prize pool, start time, cleared calls.
    async fn record_round_start(
        &self,
        game_id: GameId,
        seed: i64,
        master_card: &BingoCard,
        prize_pool: i64,
        start_time: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn record_called_numbers(&self, game_id: GameId, called: &[u8]) -> StoreResult<()>;

    async fn record_interval(&self, game_id: GameId, interval_ms: i64) -> StoreResult<()>;

    /// Persists the finished status and winner in one write.
    async fn record_winner(&self, game_id: GameId, winner_id: Option<UserId>) -> StoreResult<()>;

    /// Returns the game row to its freshly-created shape.
    async fn reset_game(&self, game_id: GameId) -> StoreResult<()>;

    async fn user(&self, id: UserId) -> StoreResult<Option<UserRecord>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    async fn create_user(&self, username: &str, balance: i64) -> StoreResult<UserRecord>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn lobby_from_row(row: &PgRow) -> Lobby {
        Lobby {
            id: row.get("id"),
            entry_fee: row.get("entry_fee"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        }
    }

    fn game_from_row(row: &PgRow) -> StoreResult<GameRecord> {
        let status: String = row.get("status");
        let master_card: Option<String> = row.get("master_card");
        let master_card = match master_card {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        let called: String = row.get("called_numbers");

        Ok(GameRecord {
            id: row.get("id"),
            lobby_id: row.get("lobby_id"),
            game_number: row.get("game_number"),
            status: status.parse().unwrap_or(GameStatus::Waiting),
            master_card,
            seed: row.get("seed"),
            called_numbers: decode_numbers(&called),
            prize_pool: row.get("prize_pool"),
            winner_id: row.get("winner_id"),
            start_time: row
                .get::<Option<chrono::NaiveDateTime>, _>("start_time")
                .map(|dt| dt.and_utc()),
            interval_ms: row.get("interval_ms"),
        })
    }

    fn seat_from_row(row: &PgRow) -> SeatRecord {
        let marked: String = row.get("marked_cells");
        SeatRecord {
            id: row.get("id"),
            game_id: row.get("game_id"),
            user_id: row.get("user_id"),
            seat_number: row.get("seat_number"),
            marked_cells: decode_numbers(&marked),
        }
    }

    async fn seat_views(&self, game_id: GameId) -> StoreResult<Vec<SeatView>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.game_id, s.user_id, s.seat_number, s.marked_cells,
                   u.id AS u_id, u.username, u.balance
            FROM seats s
            JOIN users u ON u.id = s.user_id
            WHERE s.game_id = $1
            ORDER BY s.seat_number ASC
            "#,
        )
        .bind(game_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .iter()
            .map(|row| SeatView {
                seat: Self::seat_from_row(row),
                user: UserRecord {
                    id: row.get("u_id"),
                    username: row.get("username"),
                    balance: row.get("balance"),
                },
            })
            .collect())
    }

    async fn game_views_for_lobby(&self, lobby_id: LobbyId) -> StoreResult<Vec<GameView>> {
        let rows = sqlx::query(
            r#"
            SELECT id, lobby_id, game_number, status, master_card, seed,
                   called_numbers, prize_pool, winner_id, start_time, interval_ms
            FROM games
            WHERE lobby_id = $1
            ORDER BY game_number ASC
            "#,
        )
        .bind(lobby_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let game = Self::game_from_row(row)?;
            let seats = self.seat_views(game.id).await?;
            views.push(GameView { game, seats });
        }
        Ok(views)
    }
}

#[async_trait]
impl GameStore for PgStore {
    async fn lobby(&self, id: LobbyId) -> StoreResult<Option<Lobby>> {
        let row = sqlx::query("SELECT id, entry_fee, created_at FROM lobbies WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|row| Self::lobby_from_row(&row)))
    }

    async fn lobby_view(&self, id: LobbyId) -> StoreResult<Option<LobbyView>> {
        let Some(lobby) = self.lobby(id).await? else {
            return Ok(None);
        };
        let games = self.game_views_for_lobby(id).await?;
        Ok(Some(LobbyView { lobby, games }))
    }

    async fn list_lobbies(&self) -> StoreResult<Vec<LobbyView>> {
        let rows =
            sqlx::query("SELECT id, entry_fee, created_at FROM lobbies ORDER BY created_at ASC")
                .fetch_all(self.pool.as_ref())
                .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let lobby = Self::lobby_from_row(row);
            let games = self.game_views_for_lobby(lobby.id).await?;
            views.push(LobbyView { lobby, games });
        }
        Ok(views)
    }

    async fn create_lobby(&self, entry_fee: i64) -> StoreResult<LobbyView> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO lobbies (entry_fee) VALUES ($1) RETURNING id, entry_fee, created_at",
        )
        .bind(entry_fee)
        .fetch_one(&mut *tx)
        .await?;
        let lobby = Self::lobby_from_row(&row);

        for game_number in 1..=GAMES_PER_LOBBY as i32 {
            sqlx::query(
                r#"
                INSERT INTO games (lobby_id, game_number, status, called_numbers, prize_pool, interval_ms)
                VALUES ($1, $2, 'waiting', '', 0, $3)
                "#,
            )
            .bind(lobby.id)
            .bind(game_number)
            .bind(crate::game::constants::DEFAULT_CALL_INTERVAL_MS)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let games = self.game_views_for_lobby(lobby.id).await?;
        log::info!("Created lobby {} with {} games", lobby.id, games.len());
        Ok(LobbyView { lobby, games })
    }

    async fn game(&self, id: GameId) -> StoreResult<Option<GameRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, lobby_id, game_number, status, master_card, seed,
                   called_numbers, prize_pool, winner_id, start_time, interval_ms
            FROM games
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|row| Self::game_from_row(&row)).transpose()
    }

    async fn game_view(&self, id: GameId) -> StoreResult<Option<GameView>> {
        let Some(game) = self.game(id).await? else {
            return Ok(None);
        };
        let seats = self.seat_views(id).await?;
        Ok(Some(GameView { game, seats }))
    }

    async fn seats(&self, game_id: GameId) -> StoreResult<Vec<SeatRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, user_id, seat_number, marked_cells
            FROM seats
            WHERE game_id = $1
            ORDER BY seat_number ASC
            "#,
        )
        .bind(game_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(Self::seat_from_row).collect())
    }

    async fn seat_for_user(
        &self,
        game_id: GameId,
        user_id: UserId,
    ) -> StoreResult<Option<SeatRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, game_id, user_id, seat_number, marked_cells
            FROM seats
            WHERE game_id = $1 AND user_id = $2
            ORDER BY seat_number ASC
            LIMIT 1
            "#,
        )
        .bind(game_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|row| Self::seat_from_row(&row)))
    }

    async fn create_seat(
        &self,
        game_id: GameId,
        user_id: UserId,
        seat_number: i16,
    ) -> StoreResult<SeatRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO seats (game_id, user_id, seat_number, marked_cells)
            VALUES ($1, $2, $3, '')
            RETURNING id, game_id, user_id, seat_number, marked_cells
            "#,
        )
        .bind(game_id)
        .bind(user_id)
        .bind(seat_number)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(Self::seat_from_row(&row))
    }

    async fn delete_seats(&self, game_id: GameId) -> StoreResult<()> {
        sqlx::query("DELETE FROM seats WHERE game_id = $1")
            .bind(game_id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn set_marked_cells(&self, seat_id: SeatId, marked: &[u8]) -> StoreResult<()> {
        sqlx::query("UPDATE seats SET marked_cells = $2 WHERE id = $1")
            .bind(seat_id)
            .bind(encode_numbers(marked))
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn update_status(&self, game_id: GameId, status: GameStatus) -> StoreResult<()> {
        sqlx::query("UPDATE games SET status = $2 WHERE id = $1")
            .bind(game_id)
            .bind(status.to_string())
            .execute(self.pool.as_ref())
            .await?;
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
        let card_json = serde_json::to_string(master_card)?;
        sqlx::query(
            r#"
            UPDATE games
            SET status = 'active', seed = $2, master_card = $3,
                prize_pool = $4, start_time = $5, called_numbers = '', winner_id = NULL
            WHERE id = $1
            "#,
        )
        .bind(game_id)
        .bind(seed)
        .bind(card_json)
        .bind(prize_pool)
        .bind(start_time.naive_utc())
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn record_called_numbers(&self, game_id: GameId, called: &[u8]) -> StoreResult<()> {
        sqlx::query("UPDATE games SET called_numbers = $2 WHERE id = $1")
            .bind(game_id)
            .bind(encode_numbers(called))
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn record_interval(&self, game_id: GameId, interval_ms: i64) -> StoreResult<()> {
        sqlx::query("UPDATE games SET interval_ms = $2 WHERE id = $1")
            .bind(game_id)
            .bind(interval_ms)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn record_winner(&self, game_id: GameId, winner_id: Option<UserId>) -> StoreResult<()> {
        sqlx::query("UPDATE games SET status = 'finished', winner_id = $2 WHERE id = $1")
            .bind(game_id)
            .bind(winner_id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn reset_game(&self, game_id: GameId) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE games
            SET status = 'waiting', master_card = NULL, seed = NULL,
                called_numbers = '', prize_pool = 0, winner_id = NULL, start_time = NULL
            WHERE id = $1
            "#,
        )
        .bind(game_id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query("SELECT id, username, balance FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            username: row.get("username"),
            balance: row.get("balance"),
        }))
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query("SELECT id, username, balance FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            username: row.get("username"),
            balance: row.get("balance"),
        }))
    }

    async fn create_user(&self, username: &str, balance: i64) -> StoreResult<UserRecord> {
        let row = sqlx::query(
            "INSERT INTO users (username, balance) VALUES ($1, $2) RETURNING id, username, balance",
        )
        .bind(username)
        .bind(balance)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(UserRecord {
            id: row.get("id"),
            username: row.get("username"),
            balance: row.get("balance"),
        })
    }
}
