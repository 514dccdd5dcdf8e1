//! Error types for decoding wire frames.

/// Errors that can occur when decoding a frame received from a relay client.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame was not valid JSON, or its payload did not match the event.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The envelope named an event the relay does not accept from clients.
    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),
}
