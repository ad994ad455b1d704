//! Error types for redundancy coding.

use thiserror::Error;

/// Result type for redundancy operations
pub type Result<T> = std::result::Result<T, RedundancyError>;

/// Errors raised by erasure tables and the Reed-Solomon coder
#[derive(Error, Debug)]
pub enum RedundancyError {
    /// An erasure table violated a construction invariant
    #[error("malformed erasure table: {reason}")]
    MalformedTable {
        /// Description of the violated invariant
        reason: &'static str,
    },

    /// A shard group exceeds what the coding field can address
    #[error("shard group of {total} exceeds maximum of {limit}")]
    GroupTooLarge {
        /// Total shards requested (data + parity)
        total: usize,
        /// Field limit
        limit: usize,
    },

    /// The underlying Reed-Solomon coder failed
    #[error("reed-solomon coding failed: {0}")]
    Coder(#[from] reed_solomon_erasure::Error),
}
