//! JSON frames exchanged between publishers, the relay, and dashboards.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};

/// Greeting sent to every subscriber right after it connects.
pub const WELCOME_MESSAGE: &str = "Connected to Voice Analytics Dashboard";

/// Confirmation text for `request_analytics`.
pub const ANALYTICS_ACK_MESSAGE: &str = "Analytics request received";

/// Discriminator carried inside every metrics payload as `"type"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    #[default]
    MetricsUpdate,
}

/// The metric values a dashboard renders. Durations are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsData {
    /// Wall-clock length of the conversation as `"Xm Ys"`, or `"N/A"`.
    pub conversation_duration: String,
    pub total_speaking_time: f64,
    pub user_speaking_time: f64,
    pub agent_speaking_time: f64,
    pub turn_count: u64,
    pub average_turn_length: f64,
    pub longest_pause: f64,
    pub interruptions: u64,
}

/// Payload of a `metrics_update` event: a full snapshot, never a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(rename = "type", default)]
    pub kind: UpdateKind,
    pub timestamp: String,
    pub data: MetricsData,
}

/// Payload of a `log_message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub message: String,
    pub timestamp: String,
}

/// Payload of the `welcome` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    pub message: String,
    pub timestamp: String,
    /// Number of registered subscribers, including the one being welcomed.
    pub client_count: usize,
}

/// Payload of the `analytics_request_received` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsAck {
    pub message: String,
    pub timestamp: String,
}

/// Frames the relay writes to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RelayMessage {
    Welcome(Welcome),
    MetricsUpdate(MetricsUpdate),
    LogMessage(LogMessage),
    AnalyticsRequestReceived(AnalyticsAck),
    Error { message: String },
}

/// Frames a client writes to the relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    MetricsUpdate(MetricsUpdate),
    LogMessage(LogMessage),
    RequestAnalytics,
}

/// Loose envelope used for decoding so that `request_analytics` may carry
/// `{}`, `null`, or no `data` at all.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl ClientFrame {
    /// Decodes a text frame received from a client.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Malformed`] if the text is not a valid envelope
    /// or the payload does not match the event, and
    /// [`FrameError::UnsupportedEvent`] for any other event name.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        match envelope.event.as_str() {
            "metrics_update" => Ok(Self::MetricsUpdate(serde_json::from_value(envelope.data)?)),
            "log_message" => Ok(Self::LogMessage(serde_json::from_value(envelope.data)?)),
            "request_analytics" => Ok(Self::RequestAnalytics),
            _ => Err(FrameError::UnsupportedEvent(envelope.event)),
        }
    }

    /// Returns the event name of this frame.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MetricsUpdate(_) => "metrics_update",
            Self::LogMessage(_) => "log_message",
            Self::RequestAnalytics => "request_analytics",
        }
    }
}
