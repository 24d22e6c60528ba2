//! Error types for emotune-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for emotune-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors raised by the shared library (config, input validation)
    #[error(transparent)]
    Common(#[from] emotune_common::Error),

    /// Audio output device or playback resource errors
    #[error("Audio output error: {0}")]
    Audio(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Detection source errors (malformed classifier output, read failures)
    #[error("Detection source error: {0}")]
    Source(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using emotune-player Error
pub type Result<T> = std::result::Result<T, Error>;
