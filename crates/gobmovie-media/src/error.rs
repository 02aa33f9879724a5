//! Error types for gobmovie-media.

use std::io;
use thiserror::Error;

/// Result type for gobmovie-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for gobmovie-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed container or audio descriptor.
    #[error("Invalid format: {0}")]
    Format(String),

    /// A fixed-width field ran past the end of the input.
    #[error("Buffer underflow: need {need} bytes, have {have}")]
    BufferUnderflow { need: usize, have: usize },

    /// Input rejected before anything was written.
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl Error {
    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors caused by malformed input bytes.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::BufferUnderflow { .. })
    }

    /// True for errors raised before any output was produced.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Fail with [`Error::BufferUnderflow`] unless `buf` holds at least `need` bytes.
pub(crate) fn ensure_remaining(buf: &impl bytes::Buf, need: usize) -> Result<()> {
    let have = buf.remaining();
    if have < need {
        return Err(Error::BufferUnderflow { need, have });
    }
    Ok(())
}
