//! Engine constants.

/// Seats per game; the 15th claim starts the countdown.
pub const SEATS_PER_GAME: usize = 15;

/// A user may hold at most this many seats in a single game.
pub const MAX_SEATS_PER_USER: usize = 2;

/// Games created with each lobby.
pub const GAMES_PER_LOBBY: usize = 4;

/// Countdown window between a full table and the round starting.
pub const COUNTDOWN_SECS: u64 = 60;

/// Pause after a round ends, giving clients time to show the outcome.
pub const RESET_DELAY_SECS: u64 = 10;

/// Default delay between automatic draws.
pub const DEFAULT_CALL_INTERVAL_MS: i64 = 5000;
