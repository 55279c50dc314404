use crate::inventory_logic::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;

/// A peer that cannot take a frame within this window is disconnected.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Runs one notification client from handshake to disconnect.
///
/// The writer drains the client's frame channel into the socket; the reader only
/// watches for close (clients have nothing to say on this channel). Whichever
/// side finishes first ends the connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, mut frames) = state.broadcaster.connect();
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let send = sink.send(Message::Text(frame.to_string().into()));
            match tokio::time::timeout(WRITE_TIMEOUT, send).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => break, // client disconnected
                Err(_) => {
                    log::warn!("Client {} is not reading. Closing.", client_id);
                    break;
                }
            }
        }
    });

    let mut reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    state.broadcaster.unregister(client_id);
    log::info!("Client {} disconnected", client_id);
}
