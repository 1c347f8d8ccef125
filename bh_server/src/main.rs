//! Multiplayer bingo server using an async actor model.
//!
//! Each live game is owned by a GameActor spawned on demand by the
//! GameManager, with database-backed lobbies, seats, and wallets.

mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use bingo_hall::{
    GameManager, GameStore, PgStore, Rooms, WalletManager,
    db::{Database, DatabaseConfig},
};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a multiplayer bingo server

USAGE:
  bh_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/bingo_db]
  --lobbies    N           Number of lobbies to create at startup  [default: 0]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  DEFAULT_BALANCE          Starting balance for new users  [default: 100]
  LOBBY_ENTRY_FEE          Entry fee for lobbies created at startup  [default: 10]
";

struct Args {
    bind: SocketAddr,
    database_url: String,
    num_lobbies: usize,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.value_from_str("--bind").unwrap_or_else(|_| {
            std::env::var("SERVER_BIND")
                .unwrap_or_else(|_| "127.0.0.1:6969".to_string())
                .parse()
                .expect("Invalid SERVER_BIND address")
        }),
        database_url: pargs.value_from_str("--db-url").unwrap_or_else(|_| {
            std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://postgres@localhost/bingo_db".to_string())
        }),
        num_lobbies: pargs.value_from_str("--lobbies").unwrap_or(0),
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();
    info!("Starting bingo server at {}", args.bind);

    info!("Connecting to database: {}", args.database_url);
    let db_config = DatabaseConfig {
        database_url: args.database_url,
        max_connections: std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20),
        min_connections: std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5),
        connection_timeout_secs: std::env::var("DB_CONNECTION_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600),
        max_lifetime_secs: std::env::var("DB_MAX_LIFETIME")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800),
    };

    let db = Database::new(&db_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    info!("Database connected successfully");

    let pool = Arc::new(db.pool().clone());
    let store: Arc<PgStore> = Arc::new(PgStore::new(pool.clone()));
    let wallet_manager = Arc::new(WalletManager::new(pool.clone()));
    let rooms = Arc::new(Rooms::new());
    let game_manager = Arc::new(GameManager::new(
        store.clone(),
        wallet_manager,
        rooms,
    ));

    let default_balance = std::env::var("DEFAULT_BALANCE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);

    if args.num_lobbies > 0 {
        let entry_fee = std::env::var("LOBBY_ENTRY_FEE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        info!("Creating {} initial lobby(ies)...", args.num_lobbies);
        for i in 0..args.num_lobbies {
            match store.create_lobby(entry_fee).await {
                Ok(lobby) => {
                    info!(
                        "Created lobby {} with {} games (entry fee {})",
                        lobby.lobby.id,
                        lobby.games.len(),
                        entry_fee
                    );
                }
                Err(e) => {
                    log::error!("Failed to create lobby {}: {}", i + 1, e);
                }
            }
        }
    }

    let api_state = api::AppState {
        game_manager,
        store,
        pool,
        default_balance,
    };

    let app = api::create_router(api_state);

    info!("Starting HTTP/WebSocket server on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", args.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        args.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
