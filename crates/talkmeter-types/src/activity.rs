//! Speech-activity events raised by the voice pipeline.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// A single turn-taking event observed in a spoken conversation.
///
/// Events carry no timestamp of their own: the engine stamps each one with
/// its clock at ingestion so ordering is monotonic within one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// The conversation began (or was re-armed).
    ConversationStart,
    /// The user started speaking; opens a turn.
    UserSpeechStart,
    /// The user stopped speaking; closes the open turn, if any.
    UserSpeechEnd,
    /// The agent started speaking.
    AgentSpeechStart,
    /// The agent stopped speaking.
    AgentSpeechEnd,
    /// Someone talked over the other party.
    Interruption,
    /// A silence between turns was detected.
    Pause {
        /// Length of the silence, in seconds on the wire.
        #[serde(
            serialize_with = "serialize_secs",
            deserialize_with = "deserialize_secs"
        )]
        duration: Duration,
    },
}

impl ActivityEvent {
    /// Returns the canonical snake_case name of this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConversationStart => "conversation_start",
            Self::UserSpeechStart => "user_speech_start",
            Self::UserSpeechEnd => "user_speech_end",
            Self::AgentSpeechStart => "agent_speech_start",
            Self::AgentSpeechEnd => "agent_speech_end",
            Self::Interruption => "interruption",
            Self::Pause { .. } => "pause",
        }
    }
}

impl std::fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

fn deserialize_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(|_| {
        serde::de::Error::custom(format!(
            "pause duration must be a finite, non-negative number of seconds, got {secs}"
        ))
    })
}
