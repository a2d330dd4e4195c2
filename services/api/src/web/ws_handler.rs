//! services/api/src/web/ws_handler.rs
//!
//! The entry point for a WebSocket observer connection. Observers are
//! listeners only: the server forwards every broadcast event until the client
//! disconnects. Dropping the broadcast receiver on exit is the (idempotent)
//! deregistration.

use crate::web::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let mut events = app_state.broadcaster.subscribe();
    info!(
        "WebSocket observer connected ({} now subscribed)",
        app_state.broadcaster.observer_count()
    );

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Best effort: a slow observer just misses events.
                    warn!("WebSocket observer lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // The push channel is one-way; inbound frames are ignored.
                Some(Ok(_)) => {}
            },
        }
    }

    info!("WebSocket observer disconnected");
}
