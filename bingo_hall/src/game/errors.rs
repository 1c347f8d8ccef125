//! Game validation error types.
//!
//! Validation errors are surfaced to the initiating caller only, never
//! mutate state, and are never fatal to the game.

use crate::wallet::WalletError;
use thiserror::Error;

/// Errors produced by game operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Game is not accepting seat claims (full, or not waiting).
    #[error("Game not available")]
    GameNotAvailable,

    /// Seat number already claimed in this game.
    #[error("Seat already taken")]
    SeatTaken,

    /// Caller's balance is below the lobby entry fee.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Caller already holds the per-game seat limit.
    #[error("Max 2 seats per player")]
    SeatLimitReached,

    /// Seat number outside 1..=15.
    #[error("Invalid seat number")]
    InvalidSeatNumber,

    /// Marked number has not been called this round.
    #[error("Number {0} has not been called")]
    NumberNotCalled(u8),

    /// Caller holds no seat in this game.
    #[error("No seat in this game")]
    NotSeated,

    /// Calling interval must be positive.
    #[error("Interval must be positive")]
    InvalidInterval(i64),

    #[error("Game not found")]
    GameNotFound,

    #[error("Lobby not found")]
    LobbyNotFound,

    #[error("User not found")]
    UserNotFound,

    /// The game's actor task is gone.
    #[error("Game session unavailable")]
    SessionUnavailable,

    /// Storage failure underneath a client action.
    #[error("Storage error: {0}")]
    Store(String),
}

impl GameError {
    /// Client-safe message for the `error` event.
    pub fn client_message(&self) -> String {
        match self {
            GameError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<crate::db::StoreError> for GameError {
    fn from(err: crate::db::StoreError) -> Self {
        GameError::Store(err.to_string())
    }
}

impl From<WalletError> for GameError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InsufficientBalance { .. } => GameError::InsufficientBalance,
            WalletError::UserNotFound(_) => GameError::UserNotFound,
            other => GameError::Store(other.to_string()),
        }
    }
}

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;
