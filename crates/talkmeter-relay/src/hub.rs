//! Subscriber registry and sender-exclusive broadcast.

use std::{collections::HashMap, sync::Arc};
use talkmeter_types::{
    iso_timestamp, AnalyticsAck, Clock, RelayMessage, SystemClock, Welcome,
    ANALYTICS_ACK_MESSAGE, WELCOME_MESSAGE,
};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Outbound queues keyed by connection id.
type SessionMap = HashMap<Uuid, mpsc::Sender<String>>;

/// Registry of connected subscribers.
///
/// Each subscriber is represented by the bounded outbound queue drained by
/// its connection's writer task. Registration and removal take the write
/// lock; broadcasts iterate under the read lock and only ever `try_send`,
/// so a slow subscriber never holds up the registry or its peers.
#[derive(Clone)]
pub struct RelayHub {
    sessions: Arc<RwLock<SessionMap>>,
    clock: Arc<dyn Clock>,
    welcome_message: Arc<str>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a hub that stamps its own frames with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
            welcome_message: Arc::from(WELCOME_MESSAGE),
        }
    }

    /// Overrides the greeting sent in `welcome` frames.
    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = Arc::from(message.into());
        self
    }

    /// Registers a subscriber and sends it a `welcome` frame directly.
    ///
    /// Returns the number of registered subscribers, including this one.
    pub async fn on_connect(&self, id: Uuid, sender: mpsc::Sender<String>) -> usize {
        let client_count = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id, sender.clone());
            sessions.len()
        };

        tracing::info!(subscriber = %id, client_count, "subscriber connected");

        let welcome = RelayMessage::Welcome(Welcome {
            message: self.welcome_message.to_string(),
            timestamp: iso_timestamp(self.clock.now()),
            client_count,
        });
        if let Some(json) = encode(&welcome) {
            deliver(&sender, id, json, "welcome");
        }
        client_count
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub async fn on_disconnect(&self, id: Uuid) -> bool {
        let (removed, client_count) = {
            let mut sessions = self.sessions.write().await;
            let removed = sessions.remove(&id).is_some();
            (removed, sessions.len())
        };

        if removed {
            tracing::info!(subscriber = %id, client_count, "subscriber disconnected");
        }
        removed
    }

    /// Rebroadcasts a published frame, verbatim, to every subscriber except
    /// its publisher.
    ///
    /// Returns how many subscribers had the frame queued.
    pub async fn on_publish(&self, publisher: Uuid, message_json: String) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(id, _)| **id != publisher)
            .filter(|(id, sender)| deliver(sender, **id, message_json.clone(), "broadcast"))
            .count()
    }

    /// Acknowledges an analytics request to the requesting subscriber only.
    pub async fn on_request_analytics(&self, id: Uuid) {
        tracing::info!(subscriber = %id, "subscriber requested analytics");
        let ack = RelayMessage::AnalyticsRequestReceived(AnalyticsAck {
            message: ANALYTICS_ACK_MESSAGE.to_string(),
            timestamp: iso_timestamp(self.clock.now()),
        });
        self.send(id, &ack).await;
    }

    /// Sends a frame to one subscriber. Unknown ids are ignored.
    pub async fn send(&self, id: Uuid, message: &RelayMessage) {
        let Some(json) = encode(message) else {
            return;
        };
        let sessions = self.sessions.read().await;
        if let Some(sender) = sessions.get(&id) {
            deliver(sender, id, json, "direct");
        }
    }

    /// Number of registered subscribers.
    pub async fn client_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every registration, which ends each connection's writer task.
    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        let closed = sessions.len();
        sessions.clear();
        tracing::info!(closed, "closed all subscriber sessions");
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(message: &RelayMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("failed to serialize relay message: {}", e);
            None
        }
    }
}

/// Queues a frame without waiting. Returns whether it was queued.
fn deliver(sender: &mpsc::Sender<String>, id: Uuid, json: String, kind: &'static str) -> bool {
    match sender.try_send(json) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(
                subscriber = %id,
                kind,
                "dropping message for slow subscriber"
            );
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(subscriber = %id, kind, "dropping message for closed subscriber");
            false
        }
    }
}
