//! Lobby API handlers.
//!
//! Lobbies are fixed-shape containers: creating one creates its 4
//! waiting games in the same transaction. Snapshots come back with
//! nested games, seats, and seat owners.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bingo_hall::GameStore;
use bingo_hall::models::{LobbyId, LobbyView};
use serde::Deserialize;

use super::{AppState, ErrorResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    pub entry_fee: i64,
}

/// List all lobbies with their games and seats.
pub async fn list_lobbies(
    State(state): State<AppState>,
) -> Result<Json<Vec<LobbyView>>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.list_lobbies().await {
        Ok(lobbies) => Ok(Json(lobbies)),
        Err(e) => {
            log::error!("Failed to list lobbies: {e}");
            Err(internal_error())
        }
    }
}

/// Create a lobby and its fixed set of games.
///
/// Returns `201 Created` with the lobby snapshot. The entry fee must be
/// positive; it is what each seat claim debits.
pub async fn create_lobby(
    State(state): State<AppState>,
    Json(request): Json<CreateLobbyRequest>,
) -> Result<(StatusCode, Json<LobbyView>), (StatusCode, Json<ErrorResponse>)> {
    if request.entry_fee <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Entry fee must be positive".to_string(),
            }),
        ));
    }

    match state.store.create_lobby(request.entry_fee).await {
        Ok(lobby) => Ok((StatusCode::CREATED, Json(lobby))),
        Err(e) => {
            log::error!("Failed to create lobby: {e}");
            Err(internal_error())
        }
    }
}

/// Get one lobby snapshot.
pub async fn get_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<LobbyView>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.lobby_view(lobby_id).await {
        Ok(Some(lobby)) => Ok(Json(lobby)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Lobby not found".to_string(),
            }),
        )),
        Err(e) => {
            log::error!("Failed to load lobby {lobby_id}: {e}");
            Err(internal_error())
        }
    }
}

fn internal_error() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
}
