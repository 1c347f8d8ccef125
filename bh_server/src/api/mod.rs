//! HTTP/WebSocket API for the bingo server.
//!
//! REST endpoints cover the out-of-band surface (users, lobbies, health);
//! everything that happens inside a game flows over the WebSocket
//! gateway as tagged JSON actions and events.
//!
//! # Endpoints
//!
//! - `GET  /health` - Server health status (public)
//! - `POST /api/users` - Look up or create a user by username
//! - `GET  /api/users/{user_id}` - Get a user
//! - `GET  /api/lobbies` - List lobbies with nested games and seats
//! - `POST /api/lobbies` - Create a lobby (and its 4 games)
//! - `GET  /api/lobbies/{lobby_id}` - Get one lobby snapshot
//! - `GET  /ws` - WebSocket gateway for live game sessions

pub mod lobbies;
pub mod users;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use bingo_hall::{GameManager, GameStore};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across HTTP handlers and WebSocket
/// connections. Cloned per request; all fields are Arc-backed.
#[derive(Clone)]
pub struct AppState {
    pub game_manager: Arc<GameManager>,
    pub store: Arc<dyn GameStore>,
    pub pool: Arc<PgPool>,
    /// Starting balance for users created through `POST /api/users`.
    pub default_balance: i64,
}

/// Error body returned by REST handlers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/users", post(users::create_user))
        .route("/api/users/{user_id}", get(users::get_user))
        .route("/api/lobbies", get(lobbies::list_lobbies))
        .route("/api/lobbies", post(lobbies::create_lobby))
        .route("/api/lobbies/{lobby_id}", get(lobbies::get_lobby))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers a trivial query, otherwise
/// `503 Service Unavailable`.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let live_games = state.game_manager.live_game_count().await;

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "liveGames": live_games,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
