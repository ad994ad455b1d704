//! Single-owner and feed chunks.
//!
//! The file engine consumes these as opaque leaves: their addressing and
//! signature validation happen outside the data layer, so only the address
//! and the raw wire bytes are carried here.

use bytes::Bytes;

use super::address::ChunkAddress;

/// A single-owner chunk: identifier, signature and an inner payload, all
/// kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleOwnerChunk {
    address: ChunkAddress,
    data: Bytes,
}

impl SingleOwnerChunk {
    /// Wrap raw single-owner chunk bytes with their externally derived
    /// address.
    pub fn new_unchecked(address: ChunkAddress, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            data: data.into(),
        }
    }

    /// The chunk's address
    pub fn address(&self) -> ChunkAddress {
        self.address
    }

    /// The complete raw data
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// A feed update chunk, a single-owner chunk whose identifier encodes a
/// feed topic and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChunk(SingleOwnerChunk);

impl FeedChunk {
    /// Wrap a single-owner chunk carrying a feed update.
    pub fn new(inner: SingleOwnerChunk) -> Self {
        Self(inner)
    }

    /// The chunk's address
    pub fn address(&self) -> ChunkAddress {
        self.0.address()
    }

    /// The complete raw data
    pub fn data(&self) -> &Bytes {
        self.0.data()
    }

    /// The underlying single-owner chunk
    pub fn inner(&self) -> &SingleOwnerChunk {
        &self.0
    }
}
