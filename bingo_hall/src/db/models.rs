//! Persistent record types and the views broadcast over the wire.

use crate::card::BingoCard;
use crate::game::GameStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lobby ID type
pub type LobbyId = i64;

/// Game ID type
pub type GameId = i64;

/// Seat ID type
pub type SeatId = i64;

/// User ID type
pub type UserId = i64;

/// Lobby record. Immutable once created apart from its games.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub id: LobbyId,
    pub entry_fee: i64,
    pub created_at: DateTime<Utc>,
}

/// Durable game row: the checkpoint other readers observe while the
/// actor's in-memory projection is the working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: GameId,
    pub lobby_id: LobbyId,
    /// Lobby-scoped ordinal, 1 through 4.
    pub game_number: i32,
    pub status: GameStatus,
    pub master_card: Option<BingoCard>,
    pub seed: Option<i64>,
    pub called_numbers: Vec<u8>,
    pub prize_pool: i64,
    pub winner_id: Option<UserId>,
    pub start_time: Option<DateTime<Utc>>,
    pub interval_ms: i64,
}

/// Seat record: a claimed row-slot, created on claim and purged on reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRecord {
    pub id: SeatId,
    pub game_id: GameId,
    pub user_id: UserId,
    /// Unique within a game, 1 through 15.
    pub seat_number: i16,
    /// Manually marked numbers, always a subset of the round's calls.
    pub marked_cells: Vec<u8>,
}

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub balance: i64,
}

/// Seat with its owning user, as broadcast in `game-updated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    #[serde(flatten)]
    pub seat: SeatRecord,
    pub user: UserRecord,
}

/// Game with seat/user details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    #[serde(flatten)]
    pub game: GameRecord,
    pub seats: Vec<SeatView>,
}

/// Lobby snapshot with nested games and seats, the `lobby-state` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyView {
    #[serde(flatten)]
    pub lobby: Lobby,
    pub games: Vec<GameView>,
}

/// Encodes a number list into the comma-separated column format.
pub fn encode_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes the comma-separated column format, skipping empty segments.
pub fn decode_numbers(text: &str) -> Vec<u8> {
    text.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_codec_round_trips() {
        let numbers = vec![7, 1, 75, 33];
        assert_eq!(encode_numbers(&numbers), "7,1,75,33");
        assert_eq!(decode_numbers("7,1,75,33"), numbers);
    }

    #[test]
    fn decode_tolerates_empty_and_junk() {
        assert_eq!(decode_numbers(""), Vec::<u8>::new());
        assert_eq!(decode_numbers("5,,12"), vec![5, 12]);
        assert_eq!(decode_numbers("5, 12 ,x"), vec![5, 12]);
    }

    #[test]
    fn encode_empty_is_empty_string() {
        assert_eq!(encode_numbers(&[]), "");
    }
}
