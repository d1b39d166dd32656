//! Error types for scoring and feed reads.

use hotfeed_storage::StorageError;
use thiserror::Error;

/// Errors that abort a recomputation run
#[derive(Error, Debug)]
pub enum RankingError {
    /// The population snapshot could not be read
    #[error("Snapshot failed: {0}")]
    Snapshot(#[source] StorageError),

    /// Another run is in progress on this recomputer
    #[error("Recomputation already running")]
    AlreadyRunning,
}

/// Errors returned to feed callers
#[derive(Error, Debug)]
pub enum FeedError {
    /// Cursor string could not be decoded
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Page size must be at least 1
    #[error("Invalid limit: {0}")]
    InvalidLimit(usize),

    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl FeedError {
    /// True when the request itself was malformed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, FeedError::InvalidCursor(_) | FeedError::InvalidLimit(_))
    }
}
