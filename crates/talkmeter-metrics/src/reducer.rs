//! The pure state transition behind the metrics engine.

use chrono::{DateTime, Utc};
use std::time::Duration;
use talkmeter_types::{span_between, ActivityEvent};

/// Aggregate turn-taking metrics for one conversation.
///
/// `total_speaking_time` is always `user_speaking_time + agent_speaking_time`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationMetrics {
    pub total_speaking_time: Duration,
    pub user_speaking_time: Duration,
    pub agent_speaking_time: Duration,
    /// Completed user turns.
    pub turn_count: u64,
    /// `user_speaking_time / turn_count`; zero until the first turn completes.
    pub average_turn_length: Duration,
    pub longest_pause: Duration,
    pub interruption_count: u64,
    pub conversation_start_time: Option<DateTime<Utc>>,
    pub last_user_speech_time: Option<DateTime<Utc>>,
    pub last_agent_speech_time: Option<DateTime<Utc>>,
}

/// Metrics plus the open-turn bookkeeping needed to close user turns.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub metrics: ConversationMetrics,
    user_turn_started_at: Option<DateTime<Utc>>,
}

impl ConversationState {
    /// Whether a user turn is currently open.
    pub fn user_turn_open(&self) -> bool {
        self.user_turn_started_at.is_some()
    }
}

/// Folds one event, observed at `now`, into `state`.
///
/// Returns the log line describing the change, or `None` when the event was
/// a no-op (an end with no recorded start).
pub fn apply(
    state: &mut ConversationState,
    event: &ActivityEvent,
    now: DateTime<Utc>,
) -> Option<String> {
    let metrics = &mut state.metrics;

    match *event {
        ActivityEvent::ConversationStart => {
            metrics.conversation_start_time = Some(now);
            Some("Conversation started".to_string())
        }
        ActivityEvent::UserSpeechStart => {
            metrics.last_user_speech_time = Some(now);
            state.user_turn_started_at = Some(now);
            Some("User started speaking".to_string())
        }
        ActivityEvent::UserSpeechEnd => {
            let started = state.user_turn_started_at.take()?;
            let duration = span_between(started, now);

            metrics.user_speaking_time = metrics.user_speaking_time.saturating_add(duration);
            metrics.total_speaking_time = metrics.total_speaking_time.saturating_add(duration);
            metrics.turn_count += 1;
            metrics.average_turn_length = metrics
                .user_speaking_time
                .div_f64(metrics.turn_count as f64);

            Some(format!(
                "User finished speaking. Turn duration: {:.1}s",
                duration.as_secs_f64()
            ))
        }
        ActivityEvent::AgentSpeechStart => {
            metrics.last_agent_speech_time = Some(now);
            Some("Agent started speaking".to_string())
        }
        // Measured from the last agent start, which stays set: a repeated
        // end counts the span again.
        ActivityEvent::AgentSpeechEnd => {
            let started = metrics.last_agent_speech_time?;
            let duration = span_between(started, now);

            metrics.agent_speaking_time = metrics.agent_speaking_time.saturating_add(duration);
            metrics.total_speaking_time = metrics.total_speaking_time.saturating_add(duration);

            Some(format!(
                "Agent finished speaking. Duration: {:.1}s",
                duration.as_secs_f64()
            ))
        }
        ActivityEvent::Interruption => {
            metrics.interruption_count += 1;
            Some("Interruption detected".to_string())
        }
        ActivityEvent::Pause { duration } => {
            if duration > metrics.longest_pause {
                metrics.longest_pause = duration;
                Some(format!("New longest pause: {:.1}s", duration.as_secs_f64()))
            } else {
                Some(format!("Pause detected: {:.1}s", duration.as_secs_f64()))
            }
        }
    }
}
