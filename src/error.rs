//! Error handling for drivux.
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or rewriting an instance configuration file.
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    /// The file exists but could not be read.
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The merged content could not be written back.
    #[error("Failed to write config file '{}': {source}", path.display())]
    Write {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The advisory lock guarding read-modify-write could not be taken.
    #[error("Failed to lock config file '{}': {source}", path.display())]
    Lock {
        /// Path of the config file.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading drivux's own settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Error reading the settings file.
    #[error("Failed to read settings file: {0}")]
    Read(#[from] std::io::Error),

    /// Error parsing YAML settings.
    #[error("Invalid YAML format: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A setting that must not be empty was empty.
    #[error("Setting '{0}' must not be empty")]
    EmptyValue(&'static str),

    /// A duration value could not be understood.
    #[error("Invalid duration value: '{0}'")]
    InvalidDuration(String),
}

/// Error raised when an external command cannot be launched at all.
#[derive(Debug, Error)]
#[error("Failed to run '{program}': {source}")]
pub struct CommandError {
    /// Program that failed to spawn.
    pub program: String,
    /// The underlying error that occurred.
    #[source]
    pub source: std::io::Error,
}
