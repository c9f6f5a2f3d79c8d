//! Centralized error types for mboxapprove.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxapprove library.
#[derive(Error, Debug)]
pub enum ApproveError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified mailbox does not exist.
    #[error("Mailbox not found: {0}")]
    FileNotFound(PathBuf),

    /// A single message could not be decoded.
    #[error("Message decoding error: {0}")]
    MessageDecode(String),

    /// The dedup state or summary journal is unreadable or corrupt.
    #[error("Corrupt state file '{path}': {reason}")]
    State { path: PathBuf, reason: String },

    /// The reply sender reported a failure.
    #[error("Send failed: {0}")]
    Send(String),

    /// The configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, ApproveError>`.
pub type Result<T> = std::result::Result<T, ApproveError>;

impl ApproveError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an open/read error, promoting `NotFound` to [`ApproveError::FileNotFound`].
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `ApproveError::io`).
impl From<std::io::Error> for ApproveError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
