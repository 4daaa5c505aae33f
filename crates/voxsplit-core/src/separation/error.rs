//! Separation error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a separation job
#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Input file not found: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Invalid job parameters: {0}")]
    InvalidArgument(String),

    /// Engine construction returned no handle
    #[error("Separation engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine rejected input frames (status {0})")]
    EngineIngestFailed(i32),

    #[error("Engine separation failed (status {0})")]
    EngineSeparationFailed(i32),

    #[error("Engine reported {reported} output bytes for {capacity} byte buffers")]
    EngineOutputOverrun { reported: usize, capacity: usize },

    #[error("Failed to write output file: {path}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load separation library {path}: {reason}")]
    LibraryLoad { path: PathBuf, reason: String },

    /// Another job is running on the same orchestrator
    #[error("A separation job is already in progress")]
    JobInProgress,

    #[error("Separation worker panicked")]
    WorkerPanicked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SeparationError>;

impl From<crate::pcm::PcmError> for SeparationError {
    fn from(err: crate::pcm::PcmError) -> Self {
        match err {
            crate::pcm::PcmError::NotFound { path, source } => {
                SeparationError::NotFound { path, source }
            }
            crate::pcm::PcmError::InvalidArgument(msg) => SeparationError::InvalidArgument(msg),
            crate::pcm::PcmError::Io(e) => SeparationError::Io(e),
        }
    }
}
