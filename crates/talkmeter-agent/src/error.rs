use thiserror::Error;

/// Errors raised while reading the activity event stream.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read activity source: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid activity event on line {line}: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
