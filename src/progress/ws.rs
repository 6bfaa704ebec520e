//! WebSocket surface of the progress bus.
//!
//! Clients connect to `GET /ws` and drive membership with JSON text frames:
//!
//! ```text
//! → {"event": "join:conversation",  "data": {"conversationId": "c1", "username": "u"}}
//! ← {"event": "joined",             "data": {"conversationId": "c1", "timestamp": "..."}}
//! ← <ProgressEvent envelope>                     (one frame per bus event)
//! → {"event": "leave:conversation", "data": {"conversationId": "c1"}}
//! ```
//!
//! One socket may join any number of conversations; each join spawns a relay
//! task that forwards that conversation's events until leave or disconnect.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ProgressBus;

/// A frame sent by the client.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
enum ClientFrame {
    /// Subscribe to a conversation.
    #[serde(rename = "join:conversation")]
    Join {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(default)]
        #[allow(dead_code)]
        username: Option<String>,
    },
    /// Unsubscribe from a conversation.
    #[serde(rename = "leave:conversation")]
    Leave {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
}

/// The membership acknowledgment frame.
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data")]
enum ServerFrame {
    #[serde(rename = "joined")]
    Joined {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        timestamp: String,
    },
}

/// Build a router exposing the progress stream at `GET /ws`.
pub fn progress_ws_router(bus: Arc<ProgressBus>) -> Router {
    Router::new().route("/ws", get(handle_upgrade)).with_state(bus)
}

async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(bus): State<Arc<ProgressBus>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, bus))
}

async fn handle_socket(socket: WebSocket, bus: Arc<ProgressBus>) {
    let (mut sink, mut stream) = socket.split();

    // All outbound frames funnel through one writer task.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Per-conversation relay tasks for this socket.
    let mut relays: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(message)) = stream.next().await {
        let WsMessage::Text(text) = message else {
            continue;
        };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "unparseable client frame");
                continue;
            }
        };

        match frame {
            ClientFrame::Join {
                conversation_id, ..
            } => {
                if relays.contains_key(&conversation_id) {
                    continue;
                }
                debug!(conversation_id = %conversation_id, "socket joined conversation");

                let ack = ServerFrame::Joined {
                    conversation_id: conversation_id.clone(),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                };
                if let Ok(json) = serde_json::to_string(&ack) {
                    let _ = tx.send(json);
                }

                let mut events = bus.join(&conversation_id).await;
                let relay_tx = tx.clone();
                let relay = tokio::spawn(async move {
                    loop {
                        match events.recv().await {
                            Ok(event) => {
                                let Ok(json) = serde_json::to_string(&event) else {
                                    continue;
                                };
                                if relay_tx.send(json).is_err() {
                                    break;
                                }
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                                warn!(missed = missed, "progress relay lagged, events dropped");
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                });
                relays.insert(conversation_id, relay);
            }
            ClientFrame::Leave { conversation_id } => {
                if let Some(relay) = relays.remove(&conversation_id) {
                    debug!(conversation_id = %conversation_id, "socket left conversation");
                    relay.abort();
                }
            }
        }
    }

    for (_, relay) in relays {
        relay.abort();
    }
    writer.abort();
}
