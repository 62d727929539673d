//! Core error types for circuit-core.
//!
//! Playback itself never fails once a session is running: degenerate input is
//! normalized before it reaches the scheduler, and operations on an idle engine
//! are no-ops. What remains are rejected starts, unreadable sequence files and
//! configuration problems.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for circuit-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Playback-related errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Sequence loading errors
    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors reported by the playback controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `start()` was called with no timers to play.
    #[error("cannot start playback: the sequence has no timers")]
    EmptySequence,
}

/// Errors raised while reading a sequence definition.
#[derive(Error, Debug)]
pub enum SequenceError {
    /// The file could not be read
    #[error("Failed to read sequence from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML payload did not match the sequence schema
    #[error("Invalid TOML sequence: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON payload did not match the sequence schema
    #[error("Invalid JSON sequence: {0}")]
    Json(#[from] serde_json::Error),

    /// The sequence parsed but lists no timers
    #[error("Sequence has no timers")]
    Empty,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config directory could not be determined or created
    #[error("Failed to prepare config directory: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
