//! Game actor: the single mutation path for one live game.
//!
//! Client actions and timer firings arrive as messages on the actor's
//! inbox, so every read-modify-write of seats and status is serialized
//! per game. State transitions persist the durable game row before the
//! projection changes and the room hears about it; the hot call loop is
//! the one deliberate exception, where the durable write is
//! fire-and-forget (latency over durability).

use super::{
    GameState, GameStatus,
    constants::{COUNTDOWN_SECS, MAX_SEATS_PER_USER, RESET_DELAY_SECS, SEATS_PER_GAME},
    errors::{GameError, GameResult},
    messages::GameMessage,
    timers::{TimerBank, TimerPurpose},
};
use crate::card::{BingoCard, MAX_NUMBER, is_winner};
use crate::db::models::{GameId, GameRecord, LobbyId, UserId};
use crate::db::repository::GameStore;
use crate::net::{
    messages::ServerEvent,
    rooms::{ConnId, RoomId, Rooms},
};
use crate::wallet::WalletStore;
use chrono::Utc;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Game actor handle for sending messages.
#[derive(Clone)]
pub struct GameHandle {
    sender: mpsc::Sender<GameMessage>,
    game_id: GameId,
}

impl GameHandle {
    pub fn new(sender: mpsc::Sender<GameMessage>, game_id: GameId) -> Self {
        Self { sender, game_id }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Send a message to the game's actor.
    pub async fn send(&self, message: GameMessage) -> GameResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| GameError::SessionUnavailable)
    }
}

/// Actor owning one game's in-flight state.
pub struct GameActor {
    id: GameId,
    lobby_id: LobbyId,
    entry_fee: i64,

    /// Working copy of the game, mutated only by this actor.
    state: GameState,

    inbox: mpsc::Receiver<GameMessage>,
    timers: TimerBank,

    store: Arc<dyn GameStore>,
    wallet: Arc<dyn WalletStore>,
    rooms: Arc<Rooms>,
}

impl GameActor {
    /// Create an actor hydrated from the durable game row.
    pub fn new(
        record: &GameRecord,
        entry_fee: i64,
        participants: usize,
        store: Arc<dyn GameStore>,
        wallet: Arc<dyn WalletStore>,
        rooms: Arc<Rooms>,
    ) -> (Self, GameHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let timers = TimerBank::new(sender.clone());

        let actor = Self {
            id: record.id,
            lobby_id: record.lobby_id,
            entry_fee,
            state: GameState::from_record(record, participants),
            inbox,
            timers,
            store,
            wallet,
            rooms,
        };
        let handle = GameHandle::new(sender, record.id);

        (actor, handle)
    }

    pub fn lobby_id(&self) -> LobbyId {
        self.lobby_id
    }

    /// Run the game actor event loop.
    pub async fn run(mut self) {
        log::info!(
            "Game {} session started ({})",
            self.id,
            self.state.status
        );

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
        }

        log::info!("Game {} session closed", self.id);
    }

    async fn handle_message(&mut self, message: GameMessage) {
        match message {
            GameMessage::ClaimSeat {
                user_id,
                seat_number,
                conn,
                events,
                response,
            } => {
                let result = self.handle_claim_seat(user_id, seat_number, conn, events).await;
                let _ = response.send(result);
            }

            GameMessage::MarkCell {
                user_id,
                number,
                response,
            } => {
                let result = self.handle_mark_cell(user_id, number).await;
                let _ = response.send(result);
            }

            GameMessage::AdminStart { response } => {
                let result = self.handle_admin_start().await;
                let _ = response.send(result);
            }

            GameMessage::SetInterval {
                interval_ms,
                response,
            } => {
                let result = self.handle_set_interval(interval_ms).await;
                let _ = response.send(result);
            }

            GameMessage::GetState { response } => {
                let _ = response.send(self.state.clone());
            }

            GameMessage::TimerFired(purpose) => match purpose {
                TimerPurpose::Countdown => self.start_round().await,
                TimerPurpose::Calling => self.call_number().await,
                TimerPurpose::Reset => self.reset_round().await,
            },
        }
    }

    /// Seat-claim protocol. Validation runs in order against a
    /// consistent view of the game's seats; nothing is mutated on
    /// failure.
    async fn handle_claim_seat(
        &mut self,
        user_id: UserId,
        seat_number: u8,
        conn: ConnId,
        events: mpsc::Sender<ServerEvent>,
    ) -> GameResult<()> {
        if self.state.status != GameStatus::Waiting {
            return Err(GameError::GameNotAvailable);
        }
        if !(1..=SEATS_PER_GAME as u8).contains(&seat_number) {
            return Err(GameError::InvalidSeatNumber);
        }

        let seats = self.store.seats(self.id).await?;
        if seats.len() >= SEATS_PER_GAME {
            return Err(GameError::GameNotAvailable);
        }
        if seats.iter().any(|s| s.seat_number == seat_number as i16) {
            return Err(GameError::SeatTaken);
        }

        let user = self
            .store
            .user(user_id)
            .await?
            .ok_or(GameError::UserNotFound)?;
        if user.balance < self.entry_fee {
            return Err(GameError::InsufficientBalance);
        }

        let held = seats.iter().filter(|s| s.user_id == user_id).count();
        if held >= MAX_SEATS_PER_USER {
            return Err(GameError::SeatLimitReached);
        }

        self.wallet.debit(user_id, self.entry_fee).await?;
        self.store
            .create_seat(self.id, user_id, seat_number as i16)
            .await?;
        self.state.participants = seats.len() + 1;

        log::info!(
            "User {} claimed seat {} in game {} ({}/{})",
            user_id,
            seat_number,
            self.id,
            self.state.participants,
            SEATS_PER_GAME
        );

        self.rooms.join(RoomId::Game(self.id), conn, events).await;
        self.broadcast_game_updated().await;

        if self.state.participants == SEATS_PER_GAME {
            self.start_countdown().await;
        }

        Ok(())
    }

    /// Records a manual mark (idempotent) and re-runs the winner check
    /// for the caller's seat.
    async fn handle_mark_cell(&mut self, user_id: UserId, number: u8) -> GameResult<()> {
        if self.state.status != GameStatus::Active {
            return Err(GameError::GameNotAvailable);
        }
        // Marks stay a subset of the round's calls.
        if !self.state.called_numbers.contains(&number) {
            return Err(GameError::NumberNotCalled(number));
        }

        let seat = self
            .store
            .seat_for_user(self.id, user_id)
            .await?
            .ok_or(GameError::NotSeated)?;

        if !seat.marked_cells.contains(&number) {
            let mut marked = seat.marked_cells.clone();
            marked.push(number);
            self.store.set_marked_cells(seat.id, &marked).await?;
        }

        let called: HashSet<u8> = self.state.called_numbers.iter().copied().collect();
        let won = self
            .state
            .master_card
            .as_ref()
            .is_some_and(|card| is_winner(card.row(seat.seat_number as u8), &called));
        if won {
            self.finish_round(Some(user_id)).await;
        }

        Ok(())
    }

    /// Admin override: begin the round now, aborting any pending
    /// countdown. Rejected once the round has finished (the reset timer
    /// owns the game until it fires).
    async fn handle_admin_start(&mut self) -> GameResult<()> {
        if self.state.status == GameStatus::Finished {
            return Err(GameError::GameNotAvailable);
        }
        self.start_round().await;
        Ok(())
    }

    async fn handle_set_interval(&mut self, interval_ms: i64) -> GameResult<()> {
        if interval_ms <= 0 {
            return Err(GameError::InvalidInterval(interval_ms));
        }

        self.store.record_interval(self.id, interval_ms).await?;
        self.state.interval_ms = interval_ms;

        self.rooms
            .broadcast(
                RoomId::Game(self.id),
                ServerEvent::IntervalUpdated {
                    interval: interval_ms,
                },
            )
            .await;

        Ok(())
    }

    /// waiting -> countdown, on the 15th seat.
    async fn start_countdown(&mut self) {
        if self.state.status != GameStatus::Waiting {
            return;
        }

        if let Err(e) = self.store.update_status(self.id, GameStatus::Countdown).await {
            log::error!("Game {}: failed to persist countdown status: {e}", self.id);
        }

        self.state.status = GameStatus::Countdown;
        self.state.countdown_start = Some(Utc::now());

        self.rooms
            .broadcast(
                RoomId::Game(self.id),
                ServerEvent::CountdownStart {
                    time_left: COUNTDOWN_SECS,
                },
            )
            .await;

        self.timers
            .schedule(TimerPurpose::Countdown, Duration::from_secs(COUNTDOWN_SECS));
        log::info!("Game {} full, countdown started", self.id);
    }

    /// countdown/admin -> active: seed and build the master card,
    /// compute the pot, checkpoint the row, then begin the call loop.
    async fn start_round(&mut self) {
        self.timers.cancel(TimerPurpose::Countdown);

        let seats = match self.store.seats(self.id).await {
            Ok(seats) => seats,
            Err(e) => {
                log::error!("Game {}: failed to load seats for round start: {e}", self.id);
                return;
            }
        };

        let seed = Utc::now().timestamp_millis();
        let master_card = BingoCard::generate(seed);
        let prize_pool = self.entry_fee * seats.len() as i64;
        let started_at = Utc::now();

        if let Err(e) = self
            .store
            .record_round_start(self.id, seed, &master_card, prize_pool, started_at)
            .await
        {
            log::error!("Game {}: failed to persist round start: {e}", self.id);
        }

        self.state.status = GameStatus::Active;
        self.state.master_card = Some(master_card.clone());
        self.state.called_numbers.clear();
        self.state.prize_pool = prize_pool;
        self.state.winner_id = None;
        self.state.countdown_start = None;

        log::info!(
            "Game {} round started: seed {seed}, {} seats, pool {prize_pool}",
            self.id,
            seats.len()
        );

        self.rooms
            .broadcast(
                RoomId::Game(self.id),
                ServerEvent::GameStarted {
                    master_card,
                    prize_pool,
                    interval: self.state.interval_ms,
                },
            )
            .await;

        self.call_number().await;
    }

    /// One turn of the call loop. The loop is timer-chained: each call
    /// schedules the next one, so interval changes take effect on the
    /// next draw and any external transition (winner, exhaustion, admin)
    /// simply stops the chain.
    async fn call_number(&mut self) {
        if self.state.status != GameStatus::Active {
            return;
        }

        let called: HashSet<u8> = self.state.called_numbers.iter().copied().collect();
        let remaining: Vec<u8> = (1..=MAX_NUMBER).filter(|n| !called.contains(n)).collect();

        if remaining.is_empty() {
            self.finish_round(None).await;
            return;
        }

        let number = remaining[rand::rng().random_range(0..remaining.len())];
        self.state.called_numbers.push(number);

        // Hot-loop write: the round keeps running on the projection even
        // if this write fails.
        let store = Arc::clone(&self.store);
        let game_id = self.id;
        let snapshot = self.state.called_numbers.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_called_numbers(game_id, &snapshot).await {
                log::error!("Game {game_id}: failed to persist called numbers: {e}");
            }
        });

        self.rooms
            .broadcast(
                RoomId::Game(self.id),
                ServerEvent::NumberCalled {
                    number,
                    called_numbers: self.state.called_numbers.clone(),
                },
            )
            .await;

        if let Some(winner_id) = self.find_winner().await {
            self.finish_round(Some(winner_id)).await;
            return;
        }

        self.timers.schedule(
            TimerPurpose::Calling,
            Duration::from_millis(self.state.interval_ms.max(1) as u64),
        );
    }

    /// Sweeps seats in seat-number order; ties on the same call go to
    /// the lowest seat.
    async fn find_winner(&self) -> Option<UserId> {
        let master_card = self.state.master_card.as_ref()?;

        let seats = match self.store.seats(self.id).await {
            Ok(seats) => seats,
            Err(e) => {
                log::error!("Game {}: failed to load seats for winner check: {e}", self.id);
                return None;
            }
        };

        let called: HashSet<u8> = self.state.called_numbers.iter().copied().collect();
        seats
            .iter()
            .find(|seat| is_winner(master_card.row(seat.seat_number as u8), &called))
            .map(|seat| seat.user_id)
    }

    /// active -> finished: persist the outcome, pay the winner, schedule
    /// the reset.
    async fn finish_round(&mut self, winner_id: Option<UserId>) {
        if self.state.status == GameStatus::Finished {
            return;
        }

        self.timers.cancel(TimerPurpose::Calling);

        if let Err(e) = self.store.record_winner(self.id, winner_id).await {
            log::error!("Game {}: failed to persist winner: {e}", self.id);
        }

        self.state.status = GameStatus::Finished;
        self.state.winner_id = winner_id;

        if let Some(user_id) = winner_id {
            match self.wallet.credit(user_id, self.state.prize_pool).await {
                Ok(balance) => log::info!(
                    "Game {}: user {user_id} won {} (balance {balance})",
                    self.id,
                    self.state.prize_pool
                ),
                Err(e) => log::error!(
                    "Game {}: failed to credit winner {user_id}: {e}",
                    self.id
                ),
            }
        } else {
            log::info!("Game {}: round ended with no winner", self.id);
        }

        self.rooms
            .broadcast(
                RoomId::Game(self.id),
                ServerEvent::GameEnded {
                    winner_id,
                    prize_pool: self.state.prize_pool,
                    called_numbers: self.state.called_numbers.clone(),
                },
            )
            .await;

        self.timers
            .schedule(TimerPurpose::Reset, Duration::from_secs(RESET_DELAY_SECS));
    }

    /// finished -> waiting: purge seats, null out the row and the
    /// projection. The game is indistinguishable from a fresh one.
    async fn reset_round(&mut self) {
        if let Err(e) = self.store.delete_seats(self.id).await {
            log::error!("Game {}: failed to delete seats on reset: {e}", self.id);
        }
        if let Err(e) = self.store.reset_game(self.id).await {
            log::error!("Game {}: failed to reset game row: {e}", self.id);
        }

        self.state.status = GameStatus::Waiting;
        self.state.master_card = None;
        self.state.called_numbers.clear();
        self.state.participants = 0;
        self.state.prize_pool = 0;
        self.state.winner_id = None;
        self.state.countdown_start = None;

        self.rooms
            .broadcast(RoomId::Game(self.id), ServerEvent::GameReset)
            .await;

        log::info!("Game {} reset, waiting for seats", self.id);
    }

    async fn broadcast_game_updated(&self) {
        match self.store.game_view(self.id).await {
            Ok(Some(game)) => {
                self.rooms
                    .broadcast(RoomId::Game(self.id), ServerEvent::GameUpdated { game })
                    .await;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Game {}: failed to load game view: {e}", self.id),
        }
    }
}
