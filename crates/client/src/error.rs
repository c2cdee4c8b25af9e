//! Client error types.

use thiserror::Error;

use mousedeck_core::{DomainError, EntityId};

/// Local persistence failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("corrupt stored value for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a failed call against the catalog API, already classified for
/// the retry policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Network failure, timeout or 5xx. Worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),
    /// 4xx other than 404. Never retried.
    #[error("rejected by server ({status}): {}", .errors.join("; "))]
    Rejected { status: u16, errors: Vec<String> },
    /// The target no longer exists server-side. Never retried.
    #[error("not found")]
    NotFound,
}

impl ApiError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient(_))
    }
}

/// Errors returned to callers of the client facade.
///
/// Sync failures never show up here; they are reported as `SyncEvent`s.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no local record with id {0}")]
    NotFound(EntityId),
}

/// Push channel failures. All of them end in a reconnect.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connect timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
