use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

fn default_relay_url() -> String {
    "ws://127.0.0.1:5000/ws".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

fn default_shutdown_grace_ms() -> u64 {
    1000
}

fn default_auto_start() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub relay: RelayClientConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection to the telemetry relay.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayClientConfig {
    /// WebSocket endpoint of the relay.
    #[serde(default = "default_relay_url")]
    pub url: String,
    /// Frames buffered for the relay before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Wait between reconnection attempts. Default: 2000 ms.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// How long shutdown waits for queued frames to flush. Default: 1000 ms.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            queue_capacity: default_queue_capacity(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl RelayClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Conversation lifecycle settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Apply `ConversationStart` as soon as the agent starts.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            auto_start: default_auto_start(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Loads agent configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `TALKMETER_RELAY_URL` overrides `relay.url`
/// - `TALKMETER_LOG_LEVEL` overrides `logging.level`
/// - `TALKMETER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
pub fn load_config(path: Option<&str>) -> Result<AgentConfig, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AgentConfig::default(),
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => AgentConfig::default(),
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

pub fn apply_env_overrides(
    mut config: AgentConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AgentConfig {
    if let Some(url) = lookup("TALKMETER_RELAY_URL").filter(|url| !url.trim().is_empty()) {
        config.relay.url = url;
    }
    if let Some(level) = lookup("TALKMETER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("TALKMETER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    config
}
