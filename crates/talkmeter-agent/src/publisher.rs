//! WebSocket client that forwards conversation telemetry to the relay.

use crate::config::RelayClientConfig;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use talkmeter_metrics::TelemetrySink;
use talkmeter_types::{ClientFrame, LogMessage, MetricsUpdate, RelayMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to the background publishing task.
///
/// Publishing never blocks: frames go into a bounded queue and the task
/// writes them to whichever relay connection is current. A full queue or a
/// missing connection drops the frame.
#[derive(Debug)]
pub struct RelayPublisher {
    tx: mpsc::Sender<ClientFrame>,
    connected: Arc<AtomicBool>,
    grace: Duration,
    task: JoinHandle<()>,
}

impl RelayPublisher {
    /// Starts the publishing task. Must be called inside a tokio runtime.
    pub fn spawn(config: &RelayClientConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let connected = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run(
            config.url.clone(),
            config.reconnect_delay(),
            rx,
            connected.clone(),
        ));
        Self {
            tx,
            connected,
            grace: config.shutdown_grace(),
            task,
        }
    }

    /// Whether a relay connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Stops accepting frames, flushes what is queued within the grace
    /// period, and closes the connection.
    pub async fn shutdown(self) {
        let Self {
            tx, grace, mut task, ..
        } = self;
        drop(tx);
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            tracing::warn!("relay publisher did not flush in time, aborting");
            task.abort();
        }
    }

    fn enqueue(&self, frame: ClientFrame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(frame)) => {
                tracing::warn!(event = frame.event_name(), "relay queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(frame)) => {
                tracing::debug!(event = frame.event_name(), "relay publisher stopped, dropping frame");
            }
        }
    }
}

impl TelemetrySink for RelayPublisher {
    fn publish_metrics(&self, update: MetricsUpdate) {
        self.enqueue(ClientFrame::MetricsUpdate(update));
    }

    fn publish_log(&self, log: LogMessage) {
        self.enqueue(ClientFrame::LogMessage(log));
    }
}

async fn run(
    url: String,
    reconnect_delay: Duration,
    mut rx: mpsc::Receiver<ClientFrame>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                tracing::info!(url = %url, "connected to relay");
                connected.store(true, Ordering::Release);
                let finished = pump(ws, &mut rx).await;
                connected.store(false, Ordering::Release);
                if finished {
                    return;
                }
                tracing::warn!(url = %url, "relay connection lost");
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to connect to relay");
            }
        }

        // Frames produced while offline are stale by the time we reconnect.
        let deadline = tokio::time::Instant::now() + reconnect_delay;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(frame)) => {
                    tracing::trace!(event = frame.event_name(), "relay offline, dropping frame");
                }
                Ok(None) => return,
                Err(_) => break,
            }
        }
    }
}

/// Forwards queued frames over one connection. Returns `true` once every
/// publisher handle is gone and the queue is drained, `false` if the
/// connection broke first.
async fn pump(mut ws: RelayStream, rx: &mut mpsc::Receiver<ClientFrame>) -> bool {
    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    let _ = ws.close(None).await;
                    return true;
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode relay frame");
                        continue;
                    }
                };
                if let Err(e) = ws.send(Message::Text(text.into())).await {
                    tracing::debug!(error = %e, "relay send failed");
                    return false;
                }
            }
            incoming = ws.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<RelayMessage>(text.as_str()) {
                        Ok(RelayMessage::Welcome(welcome)) => {
                            tracing::info!(
                                client_count = welcome.client_count,
                                message = %welcome.message,
                                "relay welcomed agent"
                            );
                        }
                        Ok(RelayMessage::Error { message }) => {
                            tracing::warn!(%message, "relay rejected frame");
                        }
                        Ok(other) => {
                            tracing::trace!(?other, "ignoring relay frame");
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "unrecognised relay frame");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return false,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "relay read failed");
                    return false;
                }
            }
        }
    }
}
