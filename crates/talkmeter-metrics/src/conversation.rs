//! A metrics engine bound to a telemetry sink.

use crate::engine::{MetricsEngine, MetricsReader, MetricsSnapshot};
use crate::sink::TelemetrySink;
use crate::summary::NO_DATA_SUMMARY;
use talkmeter_types::{iso_timestamp, ActivityEvent, LogMessage};

/// Log line published before a rendered summary.
pub const SUMMARY_REQUESTED_MESSAGE: &str = "Analytics summary requested by user";

/// One live conversation: every ingested event updates the engine and is
/// followed by a `log_message` (when the event changed anything) and a
/// full `metrics_update` on the sink.
#[derive(Debug)]
pub struct Conversation<S> {
    engine: MetricsEngine,
    sink: S,
}

impl<S: TelemetrySink> Conversation<S> {
    pub fn new(engine: MetricsEngine, sink: S) -> Self {
        Self { engine, sink }
    }

    /// Applies an event and publishes the resulting log line and snapshot.
    pub fn ingest(&mut self, event: ActivityEvent) -> MetricsSnapshot {
        let update = self.engine.apply(event);
        if let Some(log) = update.log {
            self.sink.publish_log(log);
        }
        self.sink.publish_metrics(update.snapshot.to_update());
        update.snapshot
    }

    /// Renders the summary for the voice channel to speak, mirroring it to
    /// the dashboard as log lines once the conversation has started.
    pub fn request_summary(&self) -> String {
        let snapshot = self.engine.snapshot();
        if snapshot.metrics.conversation_start_time.is_none() {
            return NO_DATA_SUMMARY.to_string();
        }

        let summary = snapshot.summary();
        let timestamp = iso_timestamp(snapshot.taken_at);
        self.sink.publish_log(LogMessage {
            message: SUMMARY_REQUESTED_MESSAGE.to_string(),
            timestamp: timestamp.clone(),
        });
        self.sink.publish_log(LogMessage {
            message: summary.clone(),
            timestamp,
        });
        tracing::info!(
            turn_count = snapshot.metrics.turn_count,
            "analytics summary requested"
        );
        summary
    }

    pub fn engine(&self) -> &MetricsEngine {
        &self.engine
    }

    pub fn reader(&self) -> MetricsReader {
        self.engine.reader()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Ends the conversation, handing back the engine and the sink.
    pub fn into_parts(self) -> (MetricsEngine, S) {
        (self.engine, self.sink)
    }
}
