//! Error types for the file engine.

use thiserror::Error;

use vertex_file_primitives::{BmtError, ChunkAddress, ChunkError, StampError, StorageError};
use vertex_file_redundancy::{RedundancyError, RedundancyStrategy};
use vertex_manifest::ManifestError;

/// Result type for file engine operations
pub type Result<T> = std::result::Result<T, FileError>;

/// Errors raised by splitting, joining, recovery and traversal
#[derive(Error, Debug)]
pub enum FileError {
    /// Malformed input or configuration
    #[error("validation failed: {reason}")]
    Validation {
        /// What was malformed
        reason: String,
    },

    /// A required chunk is not tracked by the operation
    #[error("chunk not found: {address}")]
    NotFound {
        /// The untracked address
        address: ChunkAddress,
    },

    /// A tracked chunk was requested before it was resolved
    #[error("chunk not yet resolved: {address}")]
    InvalidState {
        /// The unresolved address
        address: ChunkAddress,
    },

    /// Recovered or fetched content does not hash to its claimed address
    #[error("chunk corrupted: expected {address}, derived {actual}")]
    Corruption {
        /// The address the content was expected to hash to
        address: ChunkAddress,
        /// The address the content actually hashes to
        actual: ChunkAddress,
    },

    /// Too few shards of an erasure group could be obtained
    #[error("insufficient shards: have {have}, need {need}")]
    InsufficientShards {
        /// Shards obtained
        have: usize,
        /// Shards required for recovery
        need: usize,
    },

    /// The requested fetch strategy is not available
    #[error("unsupported strategy: {strategy}")]
    UnsupportedStrategy {
        /// The rejected strategy
        strategy: RedundancyStrategy,
    },

    /// The operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Chunk construction or verification failed
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// BMT hashing failed
    #[error(transparent)]
    Bmt(#[from] BmtError),

    /// The chunk store backend failed
    #[error(transparent)]
    Storage(StorageError),

    /// Stamping a chunk failed
    #[error(transparent)]
    Stamp(#[from] StampError),

    /// Erasure coding failed
    #[error(transparent)]
    Redundancy(#[from] RedundancyError),

    /// Manifest deserialization failed
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Reading the input stream failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FileError {
    /// Construct a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

impl From<StorageError> for FileError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Cancelled => Self::Cancelled,
            other => Self::Storage(other),
        }
    }
}
