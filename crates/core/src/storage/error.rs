//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Document or attachment absent. Expected during lookups, not a failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// A mutation carried a stale revision token.
    #[error("revision conflict on document '{0}'")]
    Conflict(String),

    /// Store unreachable, request timed out, or TLS/transport failure.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The adapter's bootstrap has not completed.
    #[error("storage backend not initialized")]
    NotReady,

    /// Malformed asset input.
    #[error("invalid asset: {0}")]
    Validation(String),

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A store response outside the protocol (unexpected status or body).
    #[error("unexpected store response: {0}")]
    Unexpected(String),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(document: impl Into<String>) -> Self {
        Self::Conflict(document.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error means "the thing does not exist".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StorageError> for inkwell_shared::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::NotFound(what),
            StorageError::Conflict(doc) => Self::Conflict(doc),
            StorageError::Connection(msg) => Self::Connection(msg),
            StorageError::NotReady => Self::NotReady("storage bootstrap incomplete".to_string()),
            StorageError::Validation(msg) => Self::Validation(msg),
            StorageError::Io(e) => Self::Io(e.to_string()),
            StorageError::Unexpected(msg) => Self::Internal(msg),
        }
    }
}
