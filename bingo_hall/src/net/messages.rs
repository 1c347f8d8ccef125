//! Client actions and server events exchanged over a gateway connection.
//!
//! Every message is a JSON object with a kebab-case `type` tag and
//! camelCase fields, e.g.
//!
//! ```json
//! {"type": "join-game", "gameId": 3, "userId": 7, "seatNumber": 12}
//! ```

use crate::card::BingoCard;
use crate::db::models::{GameId, GameView, LobbyId, LobbyView, UserId};
use serde::{Deserialize, Serialize};

/// Actions a client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientAction {
    /// Subscribe to a lobby room; replied to with `lobby-state`.
    JoinLobby { lobby_id: LobbyId, user_id: UserId },

    /// Subscribe to a game room, view-only.
    JoinGameRoom { game_id: GameId },

    /// Claim a seat: validate, debit the entry fee, create the seat,
    /// subscribe, broadcast the updated game.
    JoinGame {
        game_id: GameId,
        user_id: UserId,
        seat_number: u8,
    },

    /// Mark a called number on the caller's card. Idempotent.
    MarkCell {
        game_id: GameId,
        user_id: UserId,
        number: u8,
    },

    /// Force the round to begin regardless of seat count.
    AdminStart { game_id: GameId },

    /// Change the delay between automatic draws, effective on the next
    /// scheduled call.
    AdminSetInterval { game_id: GameId, interval: i64 },
}

/// Events the server pushes to room subscribers (or, for `lobby-state`
/// and `error`, to a single caller).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full lobby snapshot, reply to `join-lobby`.
    LobbyState { lobby: LobbyView },

    /// Full game with seat/user details, after any seat claim.
    GameUpdated { game: GameView },

    /// waiting -> countdown.
    CountdownStart { time_left: u64 },

    /// countdown/admin -> active.
    GameStarted {
        master_card: BingoCard,
        prize_pool: i64,
        interval: i64,
    },

    /// Each automatic draw.
    NumberCalled { number: u8, called_numbers: Vec<u8> },

    /// active -> finished. `winner_id` is absent when all 75 numbers
    /// were exhausted with nobody completing.
    GameEnded {
        winner_id: Option<UserId>,
        prize_pool: i64,
        called_numbers: Vec<u8>,
    },

    /// finished -> waiting.
    GameReset,

    /// Calling interval changed by an admin.
    IntervalUpdated { interval: i64 },

    /// Validation failure, sent to the initiating caller only.
    Error { message: String },
}
