//! Transfer error type kept structured for retry classification.

use thiserror::Error;

/// Error from a single HTTP request attempt (curl failure, HTTP status, or a
/// local write failure). Kept as an enum so callers can classify before
/// converting to `anyhow`.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error(transparent)]
    Curl(curl::Error),
    /// HTTP response had a non-success status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Writing the body to disk failed.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
}
