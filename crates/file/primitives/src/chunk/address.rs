//! Chunk address definition and operations

use alloy_primitives::{hex, B256};

use super::error::{ChunkError, Result};
use crate::constants::ADDRESS_SIZE;

/// A 256 bit address for a chunk in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkAddress(B256);

impl ChunkAddress {
    /// Creates a new ChunkAddress from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(B256::new(bytes))
    }

    /// Create a new zero-filled address
    pub const fn zero() -> Self {
        Self(B256::ZERO)
    }

    /// Returns the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Creates a new address from a slice, checking the length
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != ADDRESS_SIZE {
            return Err(ChunkError::size(
                "address must be exactly 32 bytes",
                slice.len(),
                ADDRESS_SIZE,
            ));
        }

        Ok(Self(B256::from_slice(slice)))
    }

    /// Checks if this address is all zeros
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<B256> for ChunkAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<ChunkAddress> for B256 {
    fn from(value: ChunkAddress) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for ChunkAddress {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::ops::Deref for ChunkAddress {
    type Target = B256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ChunkAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0.as_slice()[..8]))
    }
}
