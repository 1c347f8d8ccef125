//! Per-game session engine.
//!
//! Every live game is owned by one actor task ([`actor::GameActor`]):
//! seat claims, cell marks, admin overrides, and timer firings all flow
//! through its inbox, so read-modify-write of seats and status never
//! interleaves within a game. Games are independent of each other and
//! require no cross-game coordination.
//!
//! A game cycles perpetually through
//! `waiting -> countdown -> active -> finished -> waiting` and is never
//! destroyed; seats are created per round and purged on reset.

pub mod actor;
pub mod constants;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod timers;

pub use actor::{GameActor, GameHandle};
pub use errors::{GameError, GameResult};
pub use manager::GameManager;
pub use messages::GameMessage;
pub use timers::{TimerBank, TimerPurpose};

use crate::card::BingoCard;
use crate::db::models::{GameId, GameRecord, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Game lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Countdown,
    Active,
    Finished,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Countdown => "countdown",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
        };
        write!(f, "{text}")
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(GameStatus::Waiting),
            "countdown" => Ok(GameStatus::Countdown),
            "active" => Ok(GameStatus::Active),
            "finished" => Ok(GameStatus::Finished),
            other => Err(format!("unknown game status: {other}")),
        }
    }
}

/// In-memory projection of a live game: the working copy the state
/// machine mutates. The durable game row is the checkpoint other
/// readers observe.
#[derive(Debug, Clone)]
pub struct GameState {
    pub id: GameId,
    pub status: GameStatus,
    pub master_card: Option<BingoCard>,
    pub called_numbers: Vec<u8>,
    pub participants: usize,
    pub prize_pool: i64,
    pub winner_id: Option<UserId>,
    pub countdown_start: Option<DateTime<Utc>>,
    pub interval_ms: i64,
}

impl GameState {
    /// Hydrates the projection from a durable game row.
    pub fn from_record(record: &GameRecord, participants: usize) -> Self {
        Self {
            id: record.id,
            status: record.status,
            master_card: record.master_card.clone(),
            called_numbers: record.called_numbers.clone(),
            participants,
            prize_pool: record.prize_pool,
            winner_id: record.winner_id,
            countdown_start: None,
            interval_ms: record.interval_ms,
        }
    }
}
