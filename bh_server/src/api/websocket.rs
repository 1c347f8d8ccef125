//! WebSocket gateway for live game sessions.
//!
//! One connection can follow any number of lobbies and games: actions
//! carry the target IDs, and joining a room subscribes the connection to
//! that room's event stream. All socket writes go through a single send
//! task fed by the connection's outbound channel, the same channel the
//! room registry broadcasts into.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws');
//! ws.send(JSON.stringify({type: "join-game", gameId: 3, userId: 7, seatNumber: 12}));
//! ws.onmessage = (event) => handle(JSON.parse(event.data));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use bingo_hall::{ClientAction, ConnId, GameStore, RoomId, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::AppState;

/// Outbound events buffered per connection before the room registry
/// starts dropping broadcasts for it.
const OUTBOX_CAPACITY: usize = 64;

/// Upgrade an HTTP connection to the WebSocket gateway.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn: ConnId = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (events_tx, mut events_rx) = mpsc::channel::<ServerEvent>(OUTBOX_CAPACITY);

    info!("WebSocket connected: conn={conn}");

    // Single writer: room broadcasts and direct replies both funnel
    // through the outbound channel.
    let send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientAction>(&text) {
                Ok(action) => handle_action(action, conn, &events_tx, &state).await,
                Err(e) => {
                    warn!("Failed to parse client message from {conn}: {e}");
                    send_error(&events_tx, "Invalid message format".to_string()).await;
                }
            },
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: conn={conn}");
                break;
            }
            Err(e) => {
                error!("WebSocket error on {conn}: {e}");
                break;
            }
            _ => {}
        }
    }

    state.game_manager.rooms().leave_all(conn).await;
    send_task.abort();

    info!("WebSocket disconnected: conn={conn}");
}

/// Dispatch one client action. Validation failures become `error`
/// events on the caller's own channel; room subscribers only ever see
/// the resulting broadcasts.
async fn handle_action(
    action: ClientAction,
    conn: ConnId,
    events: &mpsc::Sender<ServerEvent>,
    state: &AppState,
) {
    match action {
        ClientAction::JoinLobby { lobby_id, user_id } => {
            debug!("User {user_id} joining lobby {lobby_id} on {conn}");
            state
                .game_manager
                .rooms()
                .join(RoomId::Lobby(lobby_id), conn, events.clone())
                .await;

            match state.store.lobby_view(lobby_id).await {
                Ok(Some(lobby)) => {
                    let _ = events.send(ServerEvent::LobbyState { lobby }).await;
                }
                Ok(None) => send_error(events, "Lobby not found".to_string()).await,
                Err(e) => {
                    error!("Failed to load lobby {lobby_id}: {e}");
                    send_error(events, "Internal server error".to_string()).await;
                }
            }
        }

        ClientAction::JoinGameRoom { game_id } => {
            if let Err(e) = state
                .game_manager
                .join_game_room(game_id, conn, events.clone())
                .await
            {
                send_error(events, e.client_message()).await;
                return;
            }

            // Bring the new subscriber up to date.
            match state.store.game_view(game_id).await {
                Ok(Some(game)) => {
                    let _ = events.send(ServerEvent::GameUpdated { game }).await;
                }
                Ok(None) => {}
                Err(e) => error!("Failed to load game {game_id}: {e}"),
            }
        }

        ClientAction::JoinGame {
            game_id,
            user_id,
            seat_number,
        } => {
            if let Err(e) = state
                .game_manager
                .claim_seat(game_id, user_id, seat_number, conn, events.clone())
                .await
            {
                debug!("Seat claim rejected for user {user_id} on game {game_id}: {e}");
                send_error(events, e.client_message()).await;
            }
        }

        ClientAction::MarkCell {
            game_id,
            user_id,
            number,
        } => {
            if let Err(e) = state.game_manager.mark_cell(game_id, user_id, number).await {
                send_error(events, e.client_message()).await;
            }
        }

        ClientAction::AdminStart { game_id } => {
            info!("Admin start requested for game {game_id}");
            if let Err(e) = state.game_manager.admin_start(game_id).await {
                send_error(events, e.client_message()).await;
            }
        }

        ClientAction::AdminSetInterval { game_id, interval } => {
            info!("Admin interval change for game {game_id}: {interval}ms");
            if let Err(e) = state.game_manager.set_interval(game_id, interval).await {
                send_error(events, e.client_message()).await;
            }
        }
    }
}

async fn send_error(events: &mpsc::Sender<ServerEvent>, message: String) {
    let _ = events.send(ServerEvent::Error { message }).await;
}
