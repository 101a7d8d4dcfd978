//! WebSocket handler for live dashboard subscribers

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use super::AppState;
use crate::hub::DashboardHub;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub.clone()))
}

/// Drive one subscriber connection: register with the hub (which pushes
/// the initial snapshot), forward hub pushes to the socket, and answer
/// inbound "refresh" requests. Any close or transport error removes the
/// subscriber from the hub.
async fn handle_socket(socket: WebSocket, hub: Arc<DashboardHub>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let id = Uuid::new_v4();

    // Forward hub pushes to the socket. Ends when the hub drops the
    // sender on unsubscribe or when the socket rejects a write.
    let forward = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    hub.subscribe(id, tx).await;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if text.trim().eq_ignore_ascii_case("refresh") {
                    debug!(subscriber = %id, "Refresh requested");
                    hub.push_to(id).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                error!(subscriber = %id, error = %e, "WebSocket transport error");
                break;
            }
            _ => {}
        }
    }

    hub.unsubscribe(id);
    forward.abort();
}
