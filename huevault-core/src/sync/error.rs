//! Sync error types.

use std::time::Duration;

/// Why a single push to the remote store did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteSyncError {
    /// No answer within the per-push deadline
    #[error("Remote push timed out after {0:?}")]
    Timeout(Duration),
    /// Request could not be sent or the response could not be read
    #[error("HTTP error: {0}")]
    Http(String),
    /// The store answered but refused the document
    #[error("Remote store rejected document ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// Remote store is unreachable or shutting down
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for RemoteSyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            RemoteSyncError::Unavailable(e.to_string())
        } else {
            RemoteSyncError::Http(e.to_string())
        }
    }
}
