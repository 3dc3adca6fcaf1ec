//! Error types shared by the store, the fetcher and the feed cycle

use std::time::Duration;

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors that can abort a feed cycle
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Persisted state exists but cannot be read back
    #[error("Event store corrupted: {0}")]
    StorageCorrupt(String),

    /// Non-success status, transport failure or undecodable body
    #[error("Remote API error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    RemoteApi {
        status: Option<u16>,
        message: String,
    },

    /// An item from the API lacks a mandatory field
    #[error("Malformed event at index {index}: {reason}")]
    MalformedEvent { index: usize, reason: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid user name: {0:?}")]
    InvalidUser(String),

    /// The credential authenticates a different account than the one asked for
    #[error("Credential belongs to {login:?}, not {user:?}")]
    CredentialMismatch { user: String, login: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        FeedError::RemoteApi {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::StorageCorrupt(e.to_string())
    }
}

impl From<crate::utils::AtomicError> for FeedError {
    fn from(e: crate::utils::AtomicError) -> Self {
        match e {
            crate::utils::AtomicError::Io(io) => FeedError::Io(io),
        }
    }
}
