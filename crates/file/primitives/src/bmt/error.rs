//! Error types for BMT hashing.

use thiserror::Error;

/// Result type for BMT operations
pub type Result<T> = std::result::Result<T, BmtError>;

/// Errors that can occur while computing a BMT address
#[derive(Error, Debug)]
pub enum BmtError {
    /// The input data exceeds the maximum chunk payload size
    #[error("data size {size} exceeds maximum of {limit} bytes")]
    DataTooLarge {
        /// Size of the offending input
        size: usize,
        /// Maximum allowed size
        limit: usize,
    },

    /// The hasher pool has been shut down while work was pending
    #[error("hasher pool unavailable")]
    PoolUnavailable,
}
