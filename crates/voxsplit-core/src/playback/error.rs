//! Playback error types

use std::path::PathBuf;
use thiserror::Error;

use crate::pcm::PcmError;

/// Errors that can occur while starting, running or stopping playback
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Source file missing or unreadable
    #[error("Playback source not found: {0}")]
    NotFound(PathBuf),

    /// Stream parameters or source data are malformed
    #[error("Invalid playback argument: {0}")]
    InvalidArgument(String),

    /// Output device could not be allocated with the requested parameters
    #[error("Audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A session is already running on this engine
    #[error("Playback already started")]
    AlreadyPlaying,

    /// `stop()` called with no session
    #[error("Playback not started")]
    NotPlaying,

    /// Device stream failed while playing
    #[error("Audio stream error: {0}")]
    StreamError(String),

    /// Read or write failed inside the playback loop
    #[error("Playback I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker thread panicked
    #[error("Playback worker panicked")]
    WorkerPanicked,
}

impl From<PcmError> for PlaybackError {
    fn from(err: PcmError) -> Self {
        match err {
            PcmError::NotFound { path, .. } => PlaybackError::NotFound(path),
            PcmError::InvalidArgument(msg) => PlaybackError::InvalidArgument(msg),
            PcmError::Io(e) => PlaybackError::Io(e),
        }
    }
}

/// Result type for playback operations
pub type PlaybackResult<T> = Result<T, PlaybackError>;
