//! Spoken-language rendering of a metrics snapshot.

use crate::engine::MetricsSnapshot;
use std::time::Duration;

/// Returned by a summary request before `ConversationStart` was seen.
pub const NO_DATA_SUMMARY: &str = "No conversation data available yet.";

/// Splits a duration into whole minutes and remaining whole seconds.
fn minutes_and_seconds(duration: Duration) -> (u64, u64) {
    let secs = duration.as_secs();
    (secs / 60, secs % 60)
}

/// Formats a duration as `"Xm Ys"`, the form dashboards display.
pub fn format_clock_duration(duration: Duration) -> String {
    let (minutes, seconds) = minutes_and_seconds(duration);
    format!("{minutes}m {seconds}s")
}

pub(crate) fn render(snapshot: &MetricsSnapshot) -> String {
    let Some(elapsed) = snapshot.conversation_duration() else {
        return NO_DATA_SUMMARY.to_string();
    };
    let (minutes, seconds) = minutes_and_seconds(elapsed);
    let m = &snapshot.metrics;

    format!(
        "Conversation Analytics Summary:\n\
         - Total conversation time: {minutes} minutes and {seconds} seconds\n\
         - Total speaking time: {:.1} seconds\n\
         - Your speaking time: {:.1} seconds\n\
         - My speaking time: {:.1} seconds\n\
         - Number of turns: {}\n\
         - Average turn length: {:.1} seconds\n\
         - Longest pause: {:.1} seconds\n\
         - Interruptions: {}",
        m.total_speaking_time.as_secs_f64(),
        m.user_speaking_time.as_secs_f64(),
        m.agent_speaking_time.as_secs_f64(),
        m.turn_count,
        m.average_turn_length.as_secs_f64(),
        m.longest_pause.as_secs_f64(),
        m.interruption_count,
    )
}
