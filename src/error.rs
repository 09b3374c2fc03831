use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or validating a simulation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A checkpoint name the animation bridge does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointError {
    #[error("unknown checkpoint `{0}`")]
    Unknown(String),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
