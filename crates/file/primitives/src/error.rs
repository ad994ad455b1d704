//! Error types for the primitives crate.

use thiserror::Error;

/// Generic result type for operations in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for the primitives crate
#[derive(Error, Debug)]
pub enum Error {
    /// Errors related to chunk operations
    #[error(transparent)]
    Chunk(#[from] crate::chunk::ChunkError),

    /// Errors related to BMT hashing
    #[error(transparent)]
    Bmt(#[from] crate::bmt::BmtError),

    /// Errors related to storage operations
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    /// Errors related to postage stamping
    #[error(transparent)]
    Stamp(#[from] crate::stamp::StampError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}
