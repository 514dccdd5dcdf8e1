//! The stateful engine wrapping the reducer with a clock and a published view.

use crate::reducer::{self, ConversationMetrics, ConversationState};
use crate::summary;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use talkmeter_types::{
    iso_timestamp, span_between, ActivityEvent, Clock, LogMessage, MetricsData, MetricsUpdate,
    SystemClock, UpdateKind,
};

/// The full metric state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub metrics: ConversationMetrics,
    pub taken_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Time since `ConversationStart`, or `None` if the conversation has not started.
    pub fn conversation_duration(&self) -> Option<Duration> {
        self.metrics
            .conversation_start_time
            .map(|start| span_between(start, self.taken_at))
    }

    /// Builds the `metrics_update` payload for dashboards.
    pub fn to_update(&self) -> MetricsUpdate {
        let m = &self.metrics;
        MetricsUpdate {
            kind: UpdateKind::MetricsUpdate,
            timestamp: iso_timestamp(self.taken_at),
            data: MetricsData {
                conversation_duration: self
                    .conversation_duration()
                    .map(summary::format_clock_duration)
                    .unwrap_or_else(|| "N/A".to_string()),
                total_speaking_time: m.total_speaking_time.as_secs_f64(),
                user_speaking_time: m.user_speaking_time.as_secs_f64(),
                agent_speaking_time: m.agent_speaking_time.as_secs_f64(),
                turn_count: m.turn_count,
                average_turn_length: m.average_turn_length.as_secs_f64(),
                longest_pause: m.longest_pause.as_secs_f64(),
                interruptions: m.interruption_count,
            },
        }
    }

    /// Renders the spoken-language summary of this snapshot.
    pub fn summary(&self) -> String {
        summary::render(self)
    }
}

/// What a single [`MetricsEngine::apply`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineUpdate {
    /// Snapshot taken right after the event was applied.
    pub snapshot: MetricsSnapshot,
    /// Log line for the event; `None` when the event was a no-op.
    pub log: Option<LogMessage>,
}

/// Single-writer metrics engine for one conversation.
///
/// `apply` takes `&mut self`, so callers serialize event ingestion by
/// ownership. Concurrent readers go through [`MetricsReader`], which only
/// ever observes fully applied updates.
#[derive(Debug)]
pub struct MetricsEngine {
    state: ConversationState,
    clock: Arc<dyn Clock>,
    published: Arc<RwLock<ConversationMetrics>>,
}

impl MetricsEngine {
    /// Creates an engine driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an engine driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ConversationState::default(),
            clock,
            published: Arc::new(RwLock::new(ConversationMetrics::default())),
        }
    }

    /// Applies one activity event, stamped with the engine clock.
    pub fn apply(&mut self, event: ActivityEvent) -> EngineUpdate {
        let now = self.clock.now();
        let log = reducer::apply(&mut self.state, &event, now);

        let metrics = self.state.metrics.clone();
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = metrics.clone();

        if log.is_none() {
            tracing::debug!(event = event.name(), "ignored unpaired activity event");
        } else {
            tracing::trace!(
                event = event.name(),
                turn_count = metrics.turn_count,
                interruptions = metrics.interruption_count,
                "applied activity event"
            );
        }

        EngineUpdate {
            snapshot: MetricsSnapshot {
                metrics,
                taken_at: now,
            },
            log: log.map(|message| LogMessage {
                message,
                timestamp: iso_timestamp(now),
            }),
        }
    }

    /// Current metrics, as seen by the owner.
    pub fn metrics(&self) -> &ConversationMetrics {
        &self.state.metrics
    }

    /// Current reducer state, including open turn bookkeeping.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Snapshot of the current metrics taken now.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            metrics: self.state.metrics.clone(),
            taken_at: self.clock.now(),
        }
    }

    /// Spoken-language summary of the current metrics.
    pub fn summary(&self) -> String {
        self.snapshot().summary()
    }

    /// Returns a cloneable read handle usable from other tasks or threads.
    pub fn reader(&self) -> MetricsReader {
        MetricsReader {
            published: Arc::clone(&self.published),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of an engine's metrics.
#[derive(Debug, Clone)]
pub struct MetricsReader {
    published: Arc<RwLock<ConversationMetrics>>,
    clock: Arc<dyn Clock>,
}

impl MetricsReader {
    /// Snapshot of the last fully applied update.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let metrics = self
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        MetricsSnapshot {
            metrics,
            taken_at: self.clock.now(),
        }
    }

    pub fn summary(&self) -> String {
        self.snapshot().summary()
    }
}
