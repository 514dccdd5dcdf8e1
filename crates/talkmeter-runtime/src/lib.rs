//! Process startup shared by the talkmeter binaries.

use tracing_subscriber::EnvFilter;

/// Where a binary's configuration path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CliArg,
    EnvVar,
    Default,
}

impl ConfigSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CliArg => "cli-arg",
            Self::EnvVar => "env-var",
            Self::Default => "default",
        }
    }
}

/// Resolved configuration file for a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: String,
    pub source: ConfigSource,
}

/// Picks the config file: first CLI argument, then `env_var`, then
/// `default_path`. Blank values are skipped.
pub fn resolve_config_path(env_var: &str, default_path: &str) -> ConfigLocation {
    select_config_path(
        std::env::args().nth(1),
        std::env::var(env_var).ok(),
        default_path,
    )
}

fn select_config_path(
    cli_arg: Option<String>,
    env_value: Option<String>,
    default_path: &str,
) -> ConfigLocation {
    let present = |value: &String| !value.trim().is_empty();

    if let Some(path) = cli_arg.filter(present) {
        return ConfigLocation {
            path,
            source: ConfigSource::CliArg,
        };
    }
    if let Some(path) = env_value.filter(present) {
        return ConfigLocation {
            path,
            source: ConfigSource::EnvVar,
        };
    }
    ConfigLocation {
        path: default_path.to_string(),
        source: ConfigSource::Default,
    }
}

/// Installs the global tracing subscriber writing to stderr.
///
/// An unparseable `level` falls back to `info`.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
        () = terminate => { tracing::info!("received SIGTERM, shutting down"); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins_over_env() {
        let location = select_config_path(
            Some("cli.toml".to_string()),
            Some("env.toml".to_string()),
            "default.toml",
        );
        assert_eq!(location.path, "cli.toml");
        assert_eq!(location.source, ConfigSource::CliArg);
    }

    #[test]
    fn blank_values_fall_through_to_default() {
        let location =
            select_config_path(Some("  ".to_string()), Some(String::new()), "default.toml");
        assert_eq!(location.path, "default.toml");
        assert_eq!(location.source.as_str(), "default");
    }

    #[test]
    fn env_var_used_without_cli_argument() {
        let location = select_config_path(None, Some("env.toml".to_string()), "default.toml");
        assert_eq!(location.source, ConfigSource::EnvVar);
        assert_eq!(location.path, "env.toml");
    }
}
