//! Agent-side telemetry for talkmeter.
//!
//! Runs next to the voice pipeline: activity events arrive as JSON lines,
//! are folded into a [`talkmeter_metrics::Conversation`], and every log line
//! and snapshot is pushed to the relay by a [`RelayPublisher`].
//!
//! The publisher owns the WebSocket connection on a background task and
//! reconnects on its own. Losing the relay never stalls or fails metrics
//! computation; frames produced while disconnected are dropped.

pub mod config;
pub mod error;
pub mod output;
pub mod publisher;
pub mod source;

pub use config::{load_config, AgentConfig, ConversationConfig, LoggingConfig, RelayClientConfig};
pub use error::{ConfigError, SourceError};
pub use output::write_summary;
pub use publisher::RelayPublisher;
pub use source::{parse_line, ActivitySource, SourceCommand};
