//! User API handlers.
//!
//! There is no password flow: a username identifies a player, and
//! `POST /api/users` acts as login by returning the existing user when
//! the name is already taken. New users start with the configured
//! default balance.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bingo_hall::GameStore;
use bingo_hall::models::{UserId, UserRecord};
use serde::Deserialize;

use super::{AppState, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

/// Look up or create a user by username.
///
/// Returns `200 OK` with the user record, creating it with the default
/// balance on first sight of the name.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserRecord>, (StatusCode, Json<ErrorResponse>)> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Username is required".to_string(),
            }),
        ));
    }

    match state.store.user_by_username(username).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => match state.store.create_user(username, state.default_balance).await {
            Ok(user) => {
                log::info!("Created user {} ({})", user.username, user.id);
                Ok(Json(user))
            }
            Err(e) => {
                log::error!("Failed to create user {username}: {e}");
                Err(internal_error())
            }
        },
        Err(e) => {
            log::error!("Failed to look up user {username}: {e}");
            Err(internal_error())
        }
    }
}

/// Get a user by ID.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserRecord>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.user(user_id).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "User not found".to_string(),
            }),
        )),
        Err(e) => {
            log::error!("Failed to load user {user_id}: {e}");
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
