//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors reported by chunk store backends
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend failed to serve the request
    #[error("storage backend error: {message}")]
    Backend {
        /// Description of the backend failure
        message: String,
    },

    /// The operation was cancelled through its token
    #[error("storage operation cancelled")]
    Cancelled,
}

impl StorageError {
    /// Creates a `Backend` error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
