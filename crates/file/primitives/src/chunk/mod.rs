//! Core chunk types.
//!
//! Chunks are the fundamental unit of data in the storage network. The
//! engine produces content-addressed chunks; single-owner and feed chunks
//! are consumed as opaque leaves.

mod address;
mod content;
mod error;
mod single_owner;

pub use address::ChunkAddress;
pub use content::ContentChunk;
pub use error::{ChunkError, Result};
pub use single_owner::{FeedChunk, SingleOwnerChunk};

use bytes::Bytes;

/// Chunk variants that can appear in the network.
///
/// Modeled as a tagged union over shared accessors so the chunk kind
/// survives a serialization boundary without virtual dispatch.
#[derive(Debug, Clone)]
pub enum AnyChunk {
    /// Standard content-addressed chunk
    Cac(ContentChunk),
    /// Single-owner chunk, signed by its owner
    Soc(SingleOwnerChunk),
    /// Feed update chunk (a specialised single-owner chunk)
    Feed(FeedChunk),
}

impl AnyChunk {
    /// Get the chunk's address
    pub fn address(&self) -> ChunkAddress {
        match self {
            Self::Cac(chunk) => chunk.address(),
            Self::Soc(chunk) => chunk.address(),
            Self::Feed(chunk) => chunk.address(),
        }
    }

    /// Get the complete raw data, including any header or span prefix
    pub fn data(&self) -> &Bytes {
        match self {
            Self::Cac(chunk) => chunk.data(),
            Self::Soc(chunk) => chunk.data(),
            Self::Feed(chunk) => chunk.data(),
        }
    }

    /// Get the total size of the chunk in bytes
    pub fn size(&self) -> usize {
        self.data().len()
    }

    /// Get the content-addressed chunk, if this is one
    pub fn as_cac(&self) -> Option<&ContentChunk> {
        match self {
            Self::Cac(chunk) => Some(chunk),
            _ => None,
        }
    }

    /// Verify the chunk's content against its claimed address.
    ///
    /// Only content-addressed chunks can be re-derived from their data;
    /// other variants are accepted as-is (their authenticity is established
    /// by signature checks outside this layer).
    pub fn verify(&self, expected: &ChunkAddress) -> Result<()> {
        match self {
            Self::Cac(chunk) => chunk.verify(expected),
            Self::Soc(_) | Self::Feed(_) => Ok(()),
        }
    }
}

impl From<ContentChunk> for AnyChunk {
    fn from(chunk: ContentChunk) -> Self {
        Self::Cac(chunk)
    }
}

impl From<SingleOwnerChunk> for AnyChunk {
    fn from(chunk: SingleOwnerChunk) -> Self {
        Self::Soc(chunk)
    }
}

impl From<FeedChunk> for AnyChunk {
    fn from(chunk: FeedChunk) -> Self {
        Self::Feed(chunk)
    }
}
