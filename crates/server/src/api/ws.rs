//! WebSocket push channel.
//!
//! Each connection registers one session. Outbound messages are queued on the
//! session's channel and written by a dedicated task; inbound messages are
//! handled one at a time, each to completion before the next is read.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tubefetch_core::{ClientMessage, ServerMessage};

use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_RECEIVED, WS_MESSAGES_SENT,
    WS_PROTOCOL_ERRORS,
};
use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let session = state.sessions().register(tx);

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!(session = %session, "WebSocket client connected");

    // Forward queued messages to the client
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            WS_MESSAGES_SENT.with_label_values(&[message.kind()]).inc();
            if sender
                .send(Message::Text(message.to_json().into()))
                .await
                .is_err()
            {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match ClientMessage::parse(text.as_str()) {
                Ok(message) => {
                    WS_MESSAGES_RECEIVED
                        .with_label_values(&[message.kind()])
                        .inc();
                    debug!(session = %session, kind = message.kind(), url = message.url(), "Received message");
                    state.dispatcher().handle_message(session, message).await;
                }
                Err(e) => {
                    WS_PROTOCOL_ERRORS.inc();
                    warn!(session = %session, "Ignoring malformed message: {}", e);
                }
            },
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(_) => {
                // Pings are answered by axum; binary frames are not part of the protocol
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // Clean up
    state.sessions().unregister(session);
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!(session = %session, "WebSocket client disconnected");
}
