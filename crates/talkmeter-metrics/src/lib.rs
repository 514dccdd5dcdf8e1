//! Conversation metrics engine.
//!
//! Turns a stream of speech-activity events into running turn-taking
//! metrics for one conversation. The engine is a single-writer reducer:
//! every [`ActivityEvent`](talkmeter_types::ActivityEvent) is stamped with
//! the injected clock, folded into [`ConversationState`], and answered with
//! a full [`MetricsSnapshot`] plus an optional human-readable log line.
//!
//! The engine never fails. Unpaired or out-of-order events (a speech end
//! with no matching start, for instance) are no-ops, because the voice
//! pipeline feeding it is best-effort.
//!
//! # Layers
//!
//! - [`reducer::apply`]: the pure state transition, no clock or I/O.
//! - [`MetricsEngine`]: owns the state and clock, publishes a consistent
//!   copy for concurrent [`MetricsReader`]s.
//! - [`Conversation`]: binds an engine to a [`TelemetrySink`] so each
//!   event is followed by `log_message` and `metrics_update` publications.
//!
//! # Usage
//!
//! ```rust,ignore
//! use talkmeter_metrics::{Conversation, MetricsEngine, NullSink};
//! use talkmeter_types::ActivityEvent;
//!
//! let mut conversation = Conversation::new(MetricsEngine::new(), NullSink);
//! conversation.ingest(ActivityEvent::ConversationStart);
//! conversation.ingest(ActivityEvent::UserSpeechStart);
//! conversation.ingest(ActivityEvent::UserSpeechEnd);
//! println!("{}", conversation.request_summary());
//! ```

mod conversation;
mod engine;
pub mod reducer;
mod sink;
mod summary;

pub use conversation::{Conversation, SUMMARY_REQUESTED_MESSAGE};
pub use engine::{EngineUpdate, MetricsEngine, MetricsReader, MetricsSnapshot};
pub use reducer::{ConversationMetrics, ConversationState};
pub use sink::{NullSink, TelemetrySink};
pub use summary::{format_clock_duration, NO_DATA_SUMMARY};
