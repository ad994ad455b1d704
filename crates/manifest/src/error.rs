//! Error types for manifest deserialization.

use thiserror::Error;
use vertex_file_primitives::ChunkError;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Errors raised while deserializing mantaray nodes
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The node bytes are shorter than the fixed header
    #[error("manifest node truncated: {size} bytes, need at least {need}")]
    Truncated {
        /// Bytes available
        size: usize,
        /// Bytes required
        need: usize,
    },

    /// The version hash does not match any known mantaray version
    #[error("unrecognised manifest version")]
    UnknownVersion,

    /// The reference size byte is not a valid reference length
    #[error("invalid manifest reference size: {size}")]
    InvalidReferenceSize {
        /// The reference size byte as read
        size: usize,
    },

    /// A fork record extends past the end of the node bytes
    #[error("manifest fork at byte {offset} is truncated")]
    TruncatedFork {
        /// Offset of the fork record within the node bytes
        offset: usize,
    },

    /// A fork prefix length is out of range
    #[error("manifest fork prefix length {len} exceeds maximum of {max}")]
    InvalidPrefixLength {
        /// Prefix length as read
        len: usize,
        /// Largest representable prefix length
        max: usize,
    },

    /// A reference embedded in the node could not be decoded
    #[error(transparent)]
    Reference(#[from] ChunkError),
}
