//! PCM error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while converting or reading PCM data
#[derive(Error, Debug)]
pub enum PcmError {
    /// Input file is missing or cannot be opened for reading
    #[error("PCM file not found: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Buffer range or stream parameters are malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Read or seek failed mid-operation
    #[error("PCM I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for PCM operations
pub type PcmResult<T> = Result<T, PcmError>;
