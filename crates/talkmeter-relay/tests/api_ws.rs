//! End-to-end tests for the relay WebSocket protocol.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use talkmeter_relay::{hub::RelayHub, AppState};
use talkmeter_types::{RelayMessage, Welcome, ANALYTICS_ACK_MESSAGE, WELCOME_MESSAGE};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Starts a relay on an ephemeral port. The relay stops when the returned
/// sender fires or is dropped.
async fn start_relay() -> (SocketAddr, RelayHub, oneshot::Sender<()>) {
    let hub = RelayHub::new();
    let state = AppState::new(hub.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        talkmeter_relay::serve(listener, state, async move {
            let _ = stop_rx.await;
        })
        .await
        .unwrap();
    });

    (addr, hub, stop_tx)
}

/// Reads the next text frame as raw JSON text.
async fn next_text(ws: &mut Ws) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("connection closed")
            .expect("frame error");
        if let Message::Text(text) = frame {
            return text.as_str().to_string();
        }
    }
}

async fn next_message(ws: &mut Ws) -> RelayMessage {
    let text = next_text(ws).await;
    serde_json::from_str(&text).expect("relay frames must decode as RelayMessage")
}

/// Asserts no text frame arrives within a short window.
async fn assert_silent(ws: &mut Ws) {
    let result = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = result {
        panic!("expected no frame, got: {}", text.as_str());
    }
}

/// Connects and consumes the welcome frame.
async fn connect(addr: SocketAddr) -> (Ws, Welcome) {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("failed to connect");
    match next_message(&mut ws).await {
        RelayMessage::Welcome(welcome) => (ws, welcome),
        other => panic!("expected welcome, got {:?}", other),
    }
}

async fn wait_for_client_count(hub: &RelayHub, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.client_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client count did not settle");
}

fn metrics_frame() -> String {
    json!({
        "event": "metrics_update",
        "data": {
            "type": "metrics_update",
            "timestamp": "2025-01-01T12:00:05.000Z",
            "data": {
                "conversation_duration": "0m 5s",
                "total_speaking_time": 5.0,
                "user_speaking_time": 3.0,
                "agent_speaking_time": 2.0,
                "turn_count": 1,
                "average_turn_length": 3.0,
                "longest_pause": 0.0,
                "interruptions": 0
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn welcome_is_sent_directly_with_client_count() {
    let (addr, _hub, _stop) = start_relay().await;

    let (mut a, welcome_a) = connect(addr).await;
    assert_eq!(welcome_a.message, WELCOME_MESSAGE);
    assert_eq!(welcome_a.client_count, 1);
    assert!(!welcome_a.timestamp.is_empty());

    let (_b, welcome_b) = connect(addr).await;
    assert_eq!(welcome_b.client_count, 2);

    // A's welcome is not rebroadcast when B joins.
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn published_metrics_reach_everyone_but_the_sender() {
    let (addr, _hub, _stop) = start_relay().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;
    let (mut c, _) = connect(addr).await;

    let frame = metrics_frame();
    a.send(Message::Text(frame.clone().into())).await.unwrap();

    for subscriber in [&mut b, &mut c] {
        let received = next_text(subscriber).await;
        assert_eq!(received, frame, "frames are relayed verbatim");
        match serde_json::from_str::<RelayMessage>(&received).unwrap() {
            RelayMessage::MetricsUpdate(update) => {
                assert_eq!(update.data.turn_count, 1);
                assert_eq!(update.data.conversation_duration, "0m 5s");
            }
            other => panic!("expected metrics update, got {:?}", other),
        }
    }

    assert_silent(&mut a).await;
}

#[tokio::test]
async fn log_messages_are_relayed_in_order() {
    let (addr, _hub, _stop) = start_relay().await;
    let (mut agent, _) = connect(addr).await;
    let (mut dashboard, _) = connect(addr).await;

    for text in ["User started speaking", "User finished speaking. Turn duration: 1.0s"] {
        let frame = json!({
            "event": "log_message",
            "data": {"message": text, "timestamp": "2025-01-01T12:00:00.000Z"}
        });
        agent
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    for expected in ["User started speaking", "User finished speaking. Turn duration: 1.0s"] {
        match next_message(&mut dashboard).await {
            RelayMessage::LogMessage(log) => assert_eq!(log.message, expected),
            other => panic!("expected log message, got {:?}", other),
        }
    }
    assert_silent(&mut agent).await;
}

#[tokio::test]
async fn disconnected_subscriber_is_dropped_from_count_and_broadcasts() {
    let (addr, hub, _stop) = start_relay().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;
    let (mut c, _) = connect(addr).await;
    wait_for_client_count(&hub, 3).await;

    b.close(None).await.unwrap();
    wait_for_client_count(&hub, 2).await;

    let frame = metrics_frame();
    a.send(Message::Text(frame.clone().into())).await.unwrap();
    assert_eq!(next_text(&mut c).await, frame);

    let (_d, welcome) = connect(addr).await;
    assert_eq!(welcome.client_count, 3, "B must not be counted after leaving");
}

#[tokio::test]
async fn analytics_request_is_acknowledged_to_sender_only() {
    let (addr, _hub, _stop) = start_relay().await;
    let (mut dashboard, _) = connect(addr).await;
    let (mut other, _) = connect(addr).await;

    dashboard
        .send(Message::Text(
            json!({"event": "request_analytics", "data": {}}).to_string().into(),
        ))
        .await
        .unwrap();

    match next_message(&mut dashboard).await {
        RelayMessage::AnalyticsRequestReceived(ack) => {
            assert_eq!(ack.message, ANALYTICS_ACK_MESSAGE);
            assert!(!ack.timestamp.is_empty());
        }
        other => panic!("expected analytics ack, got {:?}", other),
    }
    assert_silent(&mut other).await;
}

#[tokio::test]
async fn malformed_frames_return_error_to_sender_only() {
    let (addr, _hub, _stop) = start_relay().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    for bad in [
        "not json".to_string(),
        json!({"event": "log_message", "data": {"timestamp": "x"}}).to_string(),
        json!({"event": "welcome", "data": {}}).to_string(),
    ] {
        a.send(Message::Text(bad.into())).await.unwrap();
        match next_message(&mut a).await {
            RelayMessage::Error { message } => assert!(!message.is_empty()),
            other => panic!("expected error frame, got {:?}", other),
        }
    }

    assert_silent(&mut b).await;
}

#[tokio::test]
async fn oversized_frames_are_rejected_not_broadcast() {
    let (addr, _hub, _stop) = start_relay().await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    let frame = json!({
        "event": "log_message",
        "data": {"message": "x".repeat(70_000), "timestamp": "2025-01-01T12:00:00.000Z"}
    });
    a.send(Message::Text(frame.to_string().into())).await.unwrap();

    match next_message(&mut a).await {
        RelayMessage::Error { message } => assert!(message.contains("maximum length")),
        other => panic!("expected error frame, got {:?}", other),
    }
    assert_silent(&mut b).await;
}

#[tokio::test]
async fn shutdown_closes_subscriber_sessions() {
    let (addr, hub, stop) = start_relay().await;
    let (mut a, _) = connect(addr).await;

    stop.send(()).unwrap();
    wait_for_client_count(&hub, 0).await;

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match a.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection should close on shutdown");
}
