//! Core primitives for the Swarm data layer.
//!
//! This crate provides the foundational types for working with chunks in a
//! content-addressed storage network: the chunk model itself, Binary Merkle
//! Tree (BMT) addressing, references, and the collaborator traits the file
//! engine depends on (chunk store, postage stamper, chunk cipher).

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

// Re-export dependencies that are part of our public API
pub use bytes;

// Core modules
pub mod bmt;
pub mod chunk;
pub mod encryption;
pub mod error;
pub mod reference;
pub mod stamp;
pub mod storage;

// Re-exports of primary types
pub use bmt::{chunk_address, BmtError, BmtHasher, BmtPool};
pub use chunk::{AnyChunk, ChunkAddress, ChunkError, ContentChunk, FeedChunk, SingleOwnerChunk};
pub use encryption::{random_key, ChunkCipher, KeystreamCipher};
pub use error::{Error, Result};
pub use reference::{EncryptionKey, Reference, ShardReference};
pub use stamp::{BatchId, NoopStamper, PostageStamp, StampError, Stamper};
pub use storage::{ChunkStore, MemoryChunkStore, StorageError, StorageResult};

/// Constants used throughout the data layer
pub mod constants {
    /// Size of a single BMT segment in bytes
    pub const SEGMENT_SIZE: usize = 32;

    /// Number of branches (leaf segments) in the BMT
    pub const BMT_BRANCHES: usize = 128;

    /// Maximum payload size of a chunk in bytes
    pub const CHUNK_SIZE: usize = SEGMENT_SIZE * BMT_BRANCHES;

    /// Size of the little-endian span prefix in bytes
    pub const SPAN_SIZE: usize = 8;

    /// Size of a stored chunk including its span prefix
    pub const CHUNK_WITH_SPAN_SIZE: usize = CHUNK_SIZE + SPAN_SIZE;

    /// Size of a hash / chunk address in bytes
    pub const HASH_SIZE: usize = 32;

    /// Size of a chunk address in bytes
    pub const ADDRESS_SIZE: usize = HASH_SIZE;

    /// Size of a plain (unencrypted) reference in bytes
    pub const REFERENCE_SIZE: usize = ADDRESS_SIZE;

    /// Size of an encrypted reference (`address ‖ decryption key`) in bytes
    pub const ENC_REFERENCE_SIZE: usize = ADDRESS_SIZE + ENCRYPTION_KEY_SIZE;

    /// Size of a symmetric chunk encryption key in bytes
    pub const ENCRYPTION_KEY_SIZE: usize = 32;

    /// Size of a batch ID in bytes
    pub const BATCH_ID_SIZE: usize = 32;
}
