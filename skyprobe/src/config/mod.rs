//! Configuration.
//!
//! [`EngineConfig`] is what the engine consumes. [`ConfigFile`] is the
//! user-facing INI file it is usually built from; CLI flags override file
//! values before the engine is constructed.

mod engine;
mod file;
mod keys;

pub use engine::{ConcurrencyModel, EngineConfig, DEFAULT_QUEUE_CAPACITY};
pub use file::{
    config_file_path, CollisionSettings, ConfigFile, EngineSettings, LoggingSettings,
    RaycastSettings, SceneSettings, ServerSettings, DEFAULT_LOG_LEVEL, DEFAULT_PORT,
};
pub use keys::ConfigKey;

use std::path::PathBuf;

use thiserror::Error;

use crate::classify::InvalidThresholds;

/// Errors from loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error(transparent)]
    Thresholds(#[from] InvalidThresholds),
}
