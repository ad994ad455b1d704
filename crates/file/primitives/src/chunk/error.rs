//! Error types for chunk operations.

use thiserror::Error;

use super::address::ChunkAddress;

/// Result type for chunk operations
pub type Result<T> = std::result::Result<T, ChunkError>;

/// Errors that can occur while constructing or validating chunks
#[derive(Error, Debug)]
pub enum ChunkError {
    /// A size constraint was violated
    #[error("{context}: size {size} exceeds limit {limit}")]
    Size {
        /// Description of the violated constraint
        context: &'static str,
        /// Size of the offending input
        size: usize,
        /// The limit that was exceeded
        limit: usize,
    },

    /// The chunk data is malformed
    #[error("invalid chunk format: {reason}")]
    Format {
        /// Description of the format violation
        reason: &'static str,
    },

    /// The chunk content does not hash to its claimed address
    #[error("chunk verification failed: expected {expected}, got {actual}")]
    Verification {
        /// The address the content was expected to hash to
        expected: ChunkAddress,
        /// The address the content actually hashes to
        actual: ChunkAddress,
    },

    /// BMT hashing failed
    #[error(transparent)]
    Bmt(#[from] crate::bmt::BmtError),
}

impl ChunkError {
    /// Creates a `Size` error
    pub fn size(context: &'static str, size: usize, limit: usize) -> Self {
        Self::Size {
            context,
            size,
            limit,
        }
    }

    /// Creates a `Format` error
    pub fn format(reason: &'static str) -> Self {
        Self::Format { reason }
    }
}
