//! Game actor message types.

use super::{GameResult, GameState, timers::TimerPurpose};
use crate::db::models::UserId;
use crate::net::{messages::ServerEvent, rooms::ConnId};
use tokio::sync::{mpsc, oneshot};

/// Messages that can be sent to a game's actor.
#[derive(Debug)]
pub enum GameMessage {
    /// Seat-claim protocol: validate, debit the entry fee, create the
    /// seat, subscribe the caller, broadcast the updated game. The 15th
    /// seat drives waiting -> countdown in the same handling.
    ClaimSeat {
        user_id: UserId,
        seat_number: u8,
        conn: ConnId,
        events: mpsc::Sender<ServerEvent>,
        response: oneshot::Sender<GameResult<()>>,
    },

    /// Record a manual mark and re-run the winner check for that seat.
    MarkCell {
        user_id: UserId,
        number: u8,
        response: oneshot::Sender<GameResult<()>>,
    },

    /// Force the round to begin regardless of seat count.
    AdminStart {
        response: oneshot::Sender<GameResult<()>>,
    },

    /// Change the calling interval, effective on the next scheduled call.
    SetInterval {
        interval_ms: i64,
        response: oneshot::Sender<GameResult<()>>,
    },

    /// Snapshot of the in-memory projection.
    GetState {
        response: oneshot::Sender<GameState>,
    },

    /// Internal: a scheduled timer elapsed.
    TimerFired(TimerPurpose),
}
