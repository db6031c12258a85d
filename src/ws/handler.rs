use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{ClientEvent, ServerEvent};
use crate::services::auth_service;
use crate::ws::hub::RealtimeHub;
use crate::AppState;

/// WebSocket handler
pub async fn websocket_handler(
    State(app_state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    // Generate unique connection ID to identify this client
    let connection_id = Uuid::new_v4();
    info!("WebSocket connection established: {}", connection_id);

    let (mut sink, mut receiver) = socket.split();

    // Everything addressed to this connection flows through one channel so
    // the socket sees events in hub order.
    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();
    app_state.hub.register(connection_id, tx.clone()).await;

    // Outbound pump: hub events -> socket frames
    let send_task = tokio::spawn(async move {
        let mut rx = UnboundedReceiverStream::new(rx);
        while let Some(event) = rx.next().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop: this connection's events are processed strictly in the
    // order received.
    while let Some(Ok(message)) = receiver.next().await {
        let Message::Text(raw) = message else {
            continue;
        };
        let event: ClientEvent = match serde_json::from_str(&raw) {
            Ok(event) => event,
            Err(e) => {
                // Malformed frames are dropped, never surfaced to the sender
                warn!("Dropping malformed event from {}: {}", connection_id, e);
                continue;
            }
        };
        dispatch_client_event(&app_state.hub, connection_id, &tx, event).await;
    }

    app_state.hub.disconnect(connection_id).await;
    send_task.abort();
    info!("WebSocket connection terminated: {}", connection_id);
}

async fn dispatch_client_event(
    hub: &RealtimeHub,
    connection_id: Uuid,
    tx: &UnboundedSender<ServerEvent>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Authenticate { token } => {
            match auth_service::verify_user_token(&token) {
                Ok(user_id) => match hub.authenticate(connection_id, &user_id).await {
                    Ok(()) => {
                        let _ = tx.send(ServerEvent::Authenticated { user_id });
                    }
                    Err(e) => {
                        let _ = tx.send(ServerEvent::AuthError {
                            message: e.to_string(),
                        });
                    }
                },
                Err(e) => {
                    warn!("WebSocket authentication failed for {}: {}", connection_id, e);
                    let _ = tx.send(ServerEvent::AuthError {
                        message: "Authentication failed".to_string(),
                    });
                }
            }
        }
        ClientEvent::JoinCurriculum { curriculum_id } => {
            if let Err(e) = hub.join_curriculum(connection_id, &curriculum_id).await {
                let _ = tx.send(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        ClientEvent::LeaveCurriculum { curriculum_id } => {
            if let Err(e) = hub.leave_curriculum(connection_id, &curriculum_id).await {
                let _ = tx.send(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        ClientEvent::CurriculumUpdate(update) => {
            if let Err(e) = hub.submit_update(connection_id, update).await {
                let _ = tx.send(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        ClientEvent::ChatMessage(message) => {
            if let Err(e) = hub.submit_chat(connection_id, message).await {
                let _ = tx.send(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
        ClientEvent::Typing {
            curriculum_id,
            is_typing,
        } => {
            if let Err(e) = hub
                .submit_typing(connection_id, &curriculum_id, is_typing)
                .await
            {
                let _ = tx.send(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // End-to-end over the dispatch layer, without a socket: protocol errors
    // come back on the offending connection only.
    #[tokio::test]
    async fn protocol_violations_answer_the_sender_only() {
        let hub = RealtimeHub::new();
        let connection_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(connection_id, tx.clone()).await;

        let event: ClientEvent =
            serde_json::from_value(json!({"type": "join_curriculum", "curriculumId": "doc1"}))
                .unwrap();
        dispatch_client_event(&hub, connection_id, &tx, event).await;

        match rx.try_recv().unwrap() {
            ServerEvent::Error { message } => {
                assert_eq!(message, "authentication required");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(hub.room_count().await, 0);
    }
}
