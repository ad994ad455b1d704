//! Binary Merkle Tree hasher over Keccak256.

use alloy_primitives::{keccak256, Keccak256};

use super::error::{BmtError, Result};
use crate::chunk::ChunkAddress;
use crate::constants::*;

const SEGMENT_PAIR_LENGTH: usize = 2 * SEGMENT_SIZE;

/// A BMT hasher bound to a chunk span.
///
/// The hasher zero-pads the payload to `BMT_BRANCHES` segments for the tree
/// math only; the stored payload keeps its original length. Hashing is pure
/// and deterministic for a given `(span, data)` pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct BmtHasher {
    span: u64,
}

impl BmtHasher {
    /// Create a hasher for the given span
    pub fn with_span(span: u64) -> Self {
        Self { span }
    }

    /// Get the configured span
    pub fn span(&self) -> u64 {
        self.span
    }

    /// Compute the chunk address for the given payload.
    ///
    /// Fails if the payload exceeds [`CHUNK_SIZE`] bytes.
    pub fn hash(&self, data: &[u8]) -> Result<ChunkAddress> {
        if data.len() > CHUNK_SIZE {
            return Err(BmtError::DataTooLarge {
                size: data.len(),
                limit: CHUNK_SIZE,
            });
        }

        let root = bmt_root(data);

        let mut hasher = Keccak256::new();
        hasher.update(self.span.to_le_bytes());
        hasher.update(root);
        Ok(ChunkAddress::from(hasher.finalize()))
    }
}

/// Compute the chunk address for a `(span, data)` pair.
pub fn chunk_address(span: u64, data: &[u8]) -> Result<ChunkAddress> {
    BmtHasher::with_span(span).hash(data)
}

/// Hash the zero-padded payload up the binary tree to its root segment.
fn bmt_root(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut buffer = [0u8; CHUNK_SIZE];
    let len = data.len().min(CHUNK_SIZE);
    buffer[..len].copy_from_slice(&data[..len]);

    hash_helper(&buffer)
}

/// Recursively hash segment pairs, splitting work between threads.
fn hash_helper(data: &[u8]) -> [u8; HASH_SIZE] {
    if data.len() == SEGMENT_PAIR_LENGTH {
        return *keccak256(data);
    }

    let (left, right) = data.split_at(data.len() / 2);
    let (left_hash, right_hash) = rayon::join(|| hash_helper(left), || hash_helper(right));

    let mut pair = [0u8; SEGMENT_PAIR_LENGTH];
    pair[..HASH_SIZE].copy_from_slice(&left_hash);
    pair[HASH_SIZE..].copy_from_slice(&right_hash);

    *keccak256(pair)
}
