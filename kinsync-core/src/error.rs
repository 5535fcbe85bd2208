//! Error types for kinsync.

use thiserror::Error;

use crate::source::SourceId;

/// Errors that can occur in kinsync operations.
#[derive(Error, Debug)]
pub enum KinsyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar source not found: {0}")]
    SourceNotFound(SourceId),

    #[error("Calendar source {0} is syncing; try again when it finishes")]
    SourceBusy(SourceId),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Event already exists: {0}")]
    DuplicateEvent(String),

    #[error("Invalid source URL: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for kinsync operations.
pub type KinsyncResult<T> = Result<T, KinsyncError>;

/// Why a feed URL was refused before anything was fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{0}' is not a valid URL")]
    InvalidUrl(String),

    #[error("scheme '{0}' is not allowed (use https or webcal)")]
    DisallowedScheme(String),

    #[error("host '{0}' is on a private network")]
    PrivateNetworkBlocked(String),
}

/// Failures while retrieving feed text.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("no response after {0}s")]
    Timeout(u64),

    #[error("could not read response body: {0}")]
    Body(String),
}

/// Outcome of a failed `Scheduler::sync_one` call.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Calendar source not found: {0}")]
    NotFound(SourceId),

    #[error("Calendar source {0} is disabled")]
    Disabled(SourceId),

    #[error("A sync for calendar source {0} is already running")]
    AlreadySyncing(SourceId),

    #[error("Feed URL rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Could not reach the feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Could not save imported events: {0}")]
    Store(#[from] KinsyncError),
}

impl SyncError {
    /// True for failures that the next scheduled tick may resolve on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Fetch(_) | SyncError::AlreadySyncing(_))
    }
}
