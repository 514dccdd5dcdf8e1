//! Shared types for the talkmeter workspace.
//!
//! This crate holds everything that crosses a crate or process boundary:
//! the speech-activity events raised by the voice pipeline, the JSON frames
//! exchanged with the telemetry relay, timestamp formatting, and the clock
//! abstraction the metrics engine is driven by.
//!
//! # Wire envelope
//!
//! Every WebSocket text frame is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`:
//!
//! | Event | Direction |
//! |-------|-----------|
//! | `welcome` | relay → new subscriber |
//! | `metrics_update` | publisher → relay → other subscribers |
//! | `log_message` | publisher → relay → other subscribers |
//! | `request_analytics` | subscriber → relay |
//! | `analytics_request_received` | relay → requesting subscriber |
//! | `error` | relay → offending sender |

mod activity;
mod clock;
mod error;
mod wire;

pub use activity::ActivityEvent;
pub use clock::{iso_timestamp, span_between, Clock, ManualClock, SystemClock};
pub use error::FrameError;
pub use wire::{
    AnalyticsAck, ClientFrame, LogMessage, MetricsData, MetricsUpdate, RelayMessage, UpdateKind,
    Welcome, ANALYTICS_ACK_MESSAGE, WELCOME_MESSAGE,
};
