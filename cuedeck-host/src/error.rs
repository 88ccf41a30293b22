//! Error types for cuedeck-host
//!
//! Store transitions fail with [`Error::InvalidMutation`]; engine failures use
//! [`EngineError`](crate::playback::engine::EngineError) and stay isolated to
//! the instance that raised them.

use thiserror::Error;

/// Main error type for the playback host
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State transition rejected (missing id, unknown parent, broken invariant)
    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Persisted JSON could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors from shared helpers
    #[error(transparent)]
    Common(#[from] cuedeck_common::Error),

    /// The host task is no longer running
    #[error("Playback host stopped")]
    HostStopped,
}

/// Convenience Result type using the host Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidMutation(message.into())
    }
}
