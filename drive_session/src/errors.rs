//! Error types for drive sessions.

use thiserror::Error;

/// Errors surfaced by a [`crate::DriveSession`] public operation. Exactly
/// one of these reaches the caller per failing call.
#[derive(Debug, Error)]
pub enum SessionError {
    /// All per-item failure messages of one batch, joined into one message
    /// behind a caller-facing context prefix.
    #[error("{0}")]
    Aggregated(String),

    #[error(transparent)]
    Client(#[from] drive_client::DriveClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
