//! CLI-specific error types and exit codes.

use newscast_core::{FetchError, SettingsError, SpeechPortError, StorageError};
use newscast_playback::PlaybackError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Playback orchestration failed.
    #[error("{0}")]
    Playback(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An adapter could not be constructed.
    #[error("Adapter error: {0}")]
    Adapter(String),
}

impl CliError {
    /// Map error to an exit code (see sysexits.h).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Playback(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Storage(_) => 73,  // EX_CANTCREAT
            Self::Adapter(_) => 69,  // EX_UNAVAILABLE
        }
    }
}

impl From<PlaybackError> for CliError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::PersistenceWriteFailed { .. } => Self::Storage(err.to_string()),
            other => Self::Playback(other.to_string()),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<FetchError> for CliError {
    fn from(err: FetchError) -> Self {
        Self::Adapter(err.to_string())
    }
}

impl From<SpeechPortError> for CliError {
    fn from(err: SpeechPortError) -> Self {
        Self::Adapter(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
