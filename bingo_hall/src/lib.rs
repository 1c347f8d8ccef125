//! # Bingo Hall
//!
//! A real-money multiplayer bingo engine built around one actor task per
//! live game.
//!
//! Players buy into a lobby, claim one of 15 seats in a game, and the
//! engine deterministically draws numbers on a timer until a seat's row
//! is fully called, paying the pot to the winner. Many games run
//! concurrently and independently; within a single game every mutating
//! operation (seat claim, cell mark, timer firing, admin override) is
//! serialized through that game's actor.
//!
//! ## Architecture
//!
//! - [`card`]: deterministic seed-driven card generation and the win
//!   predicate
//! - [`game`]: the per-game state machine (actor), timer scheduling, and
//!   the process-wide registry of live game sessions
//! - [`net`]: wire message vocabulary and the room registry used to fan
//!   out events to connected clients
//! - [`db`]: PostgreSQL persistence for lobbies, games, seats, and users
//! - [`wallet`]: balance debits/credits with a non-negative guarantee
//!
//! ## Example
//!
//! ```
//! use bingo_hall::BingoCard;
//!
//! // Same seed, same card: clients can audit the draw after the fact.
//! let card = BingoCard::generate(1234);
//! assert_eq!(card, BingoCard::generate(1234));
//! ```

/// Card generation and win evaluation.
pub mod card;
pub use card::{BingoCard, is_winner};

/// Per-game session engine: actor, timers, registry.
pub mod game;
pub use game::{
    GameError, GameManager, GameState, GameStatus,
    constants::{
        COUNTDOWN_SECS, DEFAULT_CALL_INTERVAL_MS, GAMES_PER_LOBBY, MAX_SEATS_PER_USER,
        RESET_DELAY_SECS, SEATS_PER_GAME,
    },
};

/// Wire protocol and room fan-out.
pub mod net;
pub use net::{
    messages::{ClientAction, ServerEvent},
    rooms::{ConnId, RoomId, Rooms},
};

/// PostgreSQL persistence tier.
pub mod db;
pub use db::{
    Database, DatabaseConfig,
    models::{self, GameId, LobbyId, SeatId, UserId},
    repository::{GameStore, PgStore, StoreError},
};

/// Balance management.
pub mod wallet;
pub use wallet::{WalletError, WalletManager, WalletStore};
