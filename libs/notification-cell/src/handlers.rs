// libs/notification-cell/src/handlers.rs
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, State,
    },
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::services::presence::PresenceDirectory;

#[derive(Clone)]
pub struct NotificationState {
    pub presence: PresenceDirectory,
}

/// Upgrade the caller to a live event connection registered under their own
/// identity. Events for other parties never reach this socket.
pub async fn appointment_events_ws(
    State(state): State<NotificationState>,
    Extension(user): Extension<User>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let party_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user ID format".to_string()))?;

    Ok(ws.on_upgrade(move |socket| serve_connection(socket, state.presence, party_id)))
}

async fn serve_connection(mut socket: WebSocket, presence: PresenceDirectory, party_id: Uuid) {
    let (conn_id, mut events) = presence.register(party_id).await;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(payload) => {
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    // Channel closed: a newer connection replaced this one.
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {} // inbound frames carry nothing we act on
                }
            }
        }
    }

    presence.deregister(party_id, conn_id).await;
    debug!("Live connection {} for party {} closed", conn_id, party_id);
}
