// crates/server/src/routes/live.rs
//! WebSocket push channel for live conversation updates.
//!
//! # Protocol
//!
//! | Frame                       | When                                        |
//! |-----------------------------|---------------------------------------------|
//! | `connected`                 | Once, right after the upgrade               |
//! | `new_message`               | A message appeared or changed               |
//! | `conversation_state_change` | The computed state of a conversation moved  |
//! | `data_refresh`              | The conversation list was rebuilt           |
//! | `pong`                      | Reply to a client `{"type":"ping"}`         |
//!
//! A protocol-level Ping is sent every 15 seconds. Any failed send ends the
//! connection and its subscription.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;

use crate::live::events::{ConnectedData, PongData};
use crate::live::{ClientMessage, PushMessage};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// GET /api/live/ws
pub async fn live_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_live_socket(socket, state))
}

async fn send_frame(socket: &mut WebSocket, frame: &PushMessage) -> bool {
    let text = match serde_json::to_string(frame) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(kind = frame.kind(), error = %e, "Failed to serialize push frame");
            return true;
        }
    };
    socket.send(Message::Text(text.into())).await.is_ok()
}

async fn handle_live_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let hub = state.orchestrator.hub().clone();
    let mut subscription = hub.subscribe();
    let subscriber_id = subscription.id;
    tracing::debug!(subscriber_id, "Live viewer connected");

    let connected = PushMessage::Connected(ConnectedData {
        subscriber_id,
        conversation_count: state.orchestrator.conversations().len(),
        timestamp: Utc::now(),
    });

    if send_frame(&mut socket, &connected).await {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                event = subscription.receiver.recv() => {
                    let Some(event) = event else { break };
                    if !send_frame(&mut socket, &event).await {
                        break;
                    }
                }
                incoming = socket.recv() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(ClientMessage::Ping) => {
                                    let pong = PushMessage::Pong(PongData { timestamp: Utc::now() });
                                    if !send_frame(&mut socket, &pong).await {
                                        break;
                                    }
                                }
                                Err(_) => {
                                    tracing::trace!(subscriber_id, "Ignoring unknown client frame");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::debug!(subscriber_id, error = %e, "Live socket receive error");
                            break;
                        }
                        Some(Ok(_)) => {}
                    }
                }
                _ = heartbeat.tick() => {
                    if socket.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    hub.unsubscribe(subscriber_id);
    tracing::debug!(subscriber_id, "Live viewer disconnected");
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/live/ws", get(live_ws))
}
