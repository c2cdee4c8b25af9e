//! WebSocket push channel.
//!
//! Each connection gets `INITIAL_DATA` first, then every broadcast until it
//! closes. Frames sent by the client are ignored.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use mousedeck_core::PushMessage;

use crate::app::services::AppServices;

pub async fn ws_handler(
    Extension(services): Extension<Arc<AppServices>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(services, socket))
}

async fn handle_socket(services: Arc<AppServices>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();

    // Register before taking the snapshot so no change falls between the two.
    let (connection_id, mut outgoing) = services.registry().register();
    info!(%connection_id, "push client connected");

    match services.snapshot().await {
        Ok(mice) => match serde_json::to_string(&PushMessage::initial_data(mice)) {
            Ok(text) => {
                if sender.send(Message::Text(text)).await.is_err() {
                    services.registry().unregister(connection_id);
                    return;
                }
            }
            Err(e) => warn!(%connection_id, error = %e, "failed to encode initial data"),
        },
        Err(e) => warn!(%connection_id, error = %e, "failed to load initial data"),
    }

    loop {
        tokio::select! {
            next = outgoing.recv() => {
                let Some(text) = next else {
                    // Registry cleared on shutdown.
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%connection_id, error = %e, "push socket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    services.registry().unregister(connection_id);
    info!(%connection_id, "push client disconnected");
}
