//! The progress WebSocket against a live endpoint.

mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use devmesh::progress::ws::progress_ws_router;
use devmesh::progress::{ProgressBus, ProgressEvent, ProgressEventType};

use common::spawn_app;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_json(socket: &mut WsStream) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn join_ack_then_event_relay_then_leave() {
    let bus = ProgressBus::shared();
    let (base_url, _server) = spawn_app(progress_ws_router(bus.clone())).await;
    let ws_url = format!("{}/ws", base_url.replace("http://", "ws://"));

    let (mut socket, _) = connect_async(&ws_url).await.unwrap();

    socket
        .send(WsMessage::Text(
            json!({
                "event": "join:conversation",
                "data": { "conversationId": "conv-1", "username": "u" },
            })
            .to_string(),
        ))
        .await
        .unwrap();

    // Ack first.
    let ack = next_json(&mut socket).await;
    assert_eq!(ack["event"], "joined");
    assert_eq!(ack["data"]["conversationId"], "conv-1");
    assert!(ack["data"]["timestamp"].as_str().is_some());

    // Give the relay task a beat to subscribe before publishing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    bus.publish(ProgressEvent::new(
        ProgressEventType::QueryProgress,
        "conv-1",
        Some("q1".into()),
        json!({ "progress": 30 }),
    ))
    .await;

    let event = next_json(&mut socket).await;
    assert_eq!(event["type"], "query:progress");
    assert_eq!(event["conversationId"], "conv-1");
    assert_eq!(event["queryId"], "q1");
    assert_eq!(event["data"]["progress"], 30);

    // After leaving, nothing more arrives.
    socket
        .send(WsMessage::Text(
            json!({
                "event": "leave:conversation",
                "data": { "conversationId": "conv-1" },
            })
            .to_string(),
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    bus.publish(ProgressEvent::new(
        ProgressEventType::QueryCompleted,
        "conv-1",
        Some("q1".into()),
        json!({ "status": "completed" }),
    ))
    .await;

    let quiet = tokio::time::timeout(Duration::from_millis(300), socket.next()).await;
    assert!(quiet.is_err(), "received a frame after leaving");
}

#[tokio::test]
async fn events_for_other_conversations_are_not_relayed() {
    let bus = ProgressBus::shared();
    let (base_url, _server) = spawn_app(progress_ws_router(bus.clone())).await;
    let ws_url = format!("{}/ws", base_url.replace("http://", "ws://"));

    let (mut socket, _) = connect_async(&ws_url).await.unwrap();
    socket
        .send(WsMessage::Text(
            json!({
                "event": "join:conversation",
                "data": { "conversationId": "mine" },
            })
            .to_string(),
        ))
        .await
        .unwrap();
    let _ack = next_json(&mut socket).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Keep the other conversation's channel alive with a direct subscriber.
    let _other_rx = bus.join("other").await;
    bus.publish(ProgressEvent::new(
        ProgressEventType::Error,
        "other",
        None,
        json!({ "error": "not for this socket" }),
    ))
    .await;
    bus.publish(ProgressEvent::new(
        ProgressEventType::AgentStatus,
        "mine",
        None,
        json!({ "agent": "discovery", "status": "busy" }),
    ))
    .await;

    // The first frame to arrive is for "mine", not "other".
    let event = next_json(&mut socket).await;
    assert_eq!(event["conversationId"], "mine");
    assert_eq!(event["type"], "agent:status");
}
