//! WebSocket endpoint: one connection per publisher or dashboard subscriber.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc};
use talkmeter_types::{ClientFrame, RelayMessage};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Maximum accepted size of a single WebSocket message (1 MiB).
const MAX_WS_MESSAGE_BYTES: usize = 1024 * 1024;

/// Maximum size of a frame the relay will rebroadcast (64 KiB).
/// Larger frames are rejected with an `error` frame rather than fanned out.
const MAX_PUBLISH_FRAME_BYTES: usize = 65_536;

/// WebSocket handler: `GET /ws`.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    tracing::debug!(remote_addr = %addr, "websocket upgrade requested");
    ws.max_message_size(MAX_WS_MESSAGE_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Handles one connection from registration to removal.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    // Bounded so a stalled client cannot grow memory without limit; once
    // full, further frames for this client are dropped by the hub.
    let (tx, mut rx) = mpsc::channel::<String>(state.outbound_buffer.max(1));

    // Forward queued frames to the socket. The queue closes when the hub
    // drops this session (disconnect or shutdown), which closes the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    state.hub.on_connect(id, tx).await;
    tracing::debug!(subscriber = %id, remote_addr = %addr, "websocket session registered");

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => handle_text(&state, id, text.as_str()).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.hub.on_disconnect(id).await;
    send_task.abort();
}

/// Dispatches one text frame from a client.
async fn handle_text(state: &AppState, id: Uuid, text: &str) {
    if text.len() > MAX_PUBLISH_FRAME_BYTES {
        send_error(
            state,
            id,
            format!(
                "Frame exceeds maximum length of {} bytes",
                MAX_PUBLISH_FRAME_BYTES
            ),
        )
        .await;
        return;
    }

    match ClientFrame::parse(text) {
        Ok(ClientFrame::MetricsUpdate(update)) => {
            let delivered = state.hub.on_publish(id, text.to_string()).await;
            tracing::info!(
                publisher = %id,
                delivered,
                turn_count = update.data.turn_count,
                "received metrics update"
            );
        }
        Ok(ClientFrame::LogMessage(log)) => {
            let delivered = state.hub.on_publish(id, text.to_string()).await;
            tracing::info!(
                publisher = %id,
                delivered,
                "received log message: {}",
                log.message
            );
        }
        Ok(ClientFrame::RequestAnalytics) => {
            state.hub.on_request_analytics(id).await;
        }
        Err(e) => {
            tracing::warn!(subscriber = %id, "rejected client frame: {}", e);
            send_error(state, id, e.to_string()).await;
        }
    }
}

async fn send_error(state: &AppState, id: Uuid, message: String) {
    state
        .hub
        .send(id, &RelayMessage::Error { message })
        .await;
}
