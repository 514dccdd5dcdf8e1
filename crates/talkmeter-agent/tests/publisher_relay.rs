//! Agent publisher against a live relay.

use futures_util::StreamExt;
use std::net::SocketAddr;
use std::time::Duration;
use talkmeter_agent::{RelayClientConfig, RelayPublisher};
use talkmeter_metrics::{Conversation, MetricsEngine, TelemetrySink, SUMMARY_REQUESTED_MESSAGE};
use talkmeter_relay::{hub::RelayHub, AppState};
use talkmeter_types::{ActivityEvent, LogMessage, ManualClock, RelayMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

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

async fn next_message(ws: &mut Ws) -> RelayMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("connection closed")
            .expect("frame error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("relay frame must decode");
        }
    }
}

async fn connect_dashboard(addr: SocketAddr) -> Ws {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("failed to connect");
    match next_message(&mut ws).await {
        RelayMessage::Welcome(_) => ws,
        other => panic!("expected welcome, got {:?}", other),
    }
}

async fn wait_connected(publisher: &RelayPublisher) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !publisher.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("publisher never connected");
}

async fn wait_for_client_count(hub: &RelayHub, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.client_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client count never settled");
}

#[tokio::test]
async fn conversation_events_reach_the_dashboard() {
    let (addr, hub, _stop) = start_relay().await;
    let mut dashboard = connect_dashboard(addr).await;

    let publisher = RelayPublisher::spawn(&RelayClientConfig::new(format!("ws://{}/ws", addr)));
    wait_connected(&publisher).await;
    wait_for_client_count(&hub, 2).await;

    let clock = ManualClock::default();
    let engine = MetricsEngine::with_clock(std::sync::Arc::new(clock.clone()));
    let mut conversation = Conversation::new(engine, publisher);

    conversation.ingest(ActivityEvent::ConversationStart);
    match next_message(&mut dashboard).await {
        RelayMessage::LogMessage(log) => assert_eq!(log.message, "Conversation started"),
        other => panic!("expected log_message, got {:?}", other),
    }
    match next_message(&mut dashboard).await {
        RelayMessage::MetricsUpdate(update) => {
            assert_eq!(update.data.turn_count, 0);
            assert_eq!(update.data.conversation_duration, "0m 0s");
        }
        other => panic!("expected metrics_update, got {:?}", other),
    }

    conversation.ingest(ActivityEvent::UserSpeechStart);
    clock.advance(Duration::from_secs(3));
    conversation.ingest(ActivityEvent::UserSpeechEnd);

    // start log, start snapshot, end log, end snapshot
    let mut last_update = None;
    for _ in 0..4 {
        if let RelayMessage::MetricsUpdate(update) = next_message(&mut dashboard).await {
            last_update = Some(update);
        }
    }
    let update = last_update.expect("no metrics_update received");
    assert_eq!(update.data.turn_count, 1);
    assert!((update.data.user_speaking_time - 3.0).abs() < 1e-9);
    assert_eq!(update.data.conversation_duration, "0m 3s");

    let summary = conversation.request_summary();
    match next_message(&mut dashboard).await {
        RelayMessage::LogMessage(log) => assert_eq!(log.message, SUMMARY_REQUESTED_MESSAGE),
        other => panic!("expected log_message, got {:?}", other),
    }
    match next_message(&mut dashboard).await {
        RelayMessage::LogMessage(log) => assert_eq!(log.message, summary),
        other => panic!("expected log_message, got {:?}", other),
    }

    let (_, publisher) = conversation.into_parts();
    publisher.shutdown().await;
    wait_for_client_count(&hub, 1).await;
}

#[tokio::test]
async fn unreachable_relay_never_blocks_publishing() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = RelayClientConfig::new(format!("ws://{}/ws", addr));
    config.queue_capacity = 4;
    config.reconnect_delay_ms = 50;
    let publisher = RelayPublisher::spawn(&config);
    let mut conversation = Conversation::new(MetricsEngine::new(), publisher);

    tokio::time::timeout(Duration::from_secs(2), async {
        conversation.ingest(ActivityEvent::ConversationStart);
        for _ in 0..500 {
            conversation.ingest(ActivityEvent::UserSpeechStart);
            conversation.ingest(ActivityEvent::UserSpeechEnd);
        }
    })
    .await
    .expect("ingest must not block on the relay");

    assert_eq!(conversation.engine().metrics().turn_count, 500);
    assert!(!conversation.sink().is_connected());

    let (_, publisher) = conversation.into_parts();
    tokio::time::timeout(Duration::from_secs(5), publisher.shutdown())
        .await
        .expect("shutdown must finish");
}

#[tokio::test]
async fn publisher_reconnects_after_relay_restart() {
    let (addr, _hub, stop) = start_relay().await;

    let mut config = RelayClientConfig::new(format!("ws://{}/ws", addr));
    config.reconnect_delay_ms = 50;
    let publisher = RelayPublisher::spawn(&config);
    wait_connected(&publisher).await;

    let _ = stop.send(());
    tokio::time::timeout(Duration::from_secs(5), async {
        while publisher.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("publisher never noticed the relay going away");

    // Bring a relay back on the same port.
    let hub = RelayHub::new();
    let listener = TcpListener::bind(addr).await.unwrap();
    let (_stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(talkmeter_relay::serve(
        listener,
        AppState::new(hub.clone()),
        async move {
            let _ = stop_rx.await;
        },
    ));
    let mut dashboard = connect_dashboard(addr).await;

    wait_connected(&publisher).await;
    wait_for_client_count(&hub, 2).await;

    publisher.publish_log(LogMessage {
        message: "back online".to_string(),
        timestamp: "2024-01-01T00:00:00.000Z".to_string(),
    });
    match next_message(&mut dashboard).await {
        RelayMessage::LogMessage(log) => assert_eq!(log.message, "back online"),
        other => panic!("expected log_message, got {:?}", other),
    }

    publisher.shutdown().await;
}
