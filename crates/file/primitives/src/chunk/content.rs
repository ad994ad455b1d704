//! Content-addressed chunks.

use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};

use super::address::ChunkAddress;
use super::error::{ChunkError, Result};
use crate::bmt::BmtHasher;
use crate::constants::{CHUNK_SIZE, CHUNK_WITH_SPAN_SIZE, SPAN_SIZE};

/// A content-addressed chunk: `span(8, LE) ‖ payload(≤ 4096)`.
///
/// The span declares the logical length the chunk covers: the payload byte
/// count for a leaf, or the total byte count of the subtree for an
/// intermediate chunk. The address is `keccak256(span ‖ BMT_root(payload))`
/// and is computed lazily, at most once.
#[derive(Debug, Clone)]
pub struct ContentChunk {
    span: u64,
    data: Bytes,
    cached_address: OnceLock<ChunkAddress>,
}

impl ContentChunk {
    /// Create a chunk from its span and payload.
    pub fn new(span: u64, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > CHUNK_SIZE {
            return Err(ChunkError::size(
                "payload exceeds maximum chunk size",
                payload.len(),
                CHUNK_SIZE,
            ));
        }

        let mut data = BytesMut::with_capacity(SPAN_SIZE + payload.len());
        data.extend_from_slice(&span.to_le_bytes());
        data.extend_from_slice(&payload);

        Ok(Self {
            span,
            data: data.freeze(),
            cached_address: OnceLock::new(),
        })
    }

    /// Create a chunk from its stored form (`span ‖ payload`).
    pub fn from_data(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < SPAN_SIZE {
            return Err(ChunkError::format("insufficient data for span"));
        }
        if data.len() > CHUNK_WITH_SPAN_SIZE {
            return Err(ChunkError::size(
                "data exceeds maximum chunk size",
                data.len(),
                CHUNK_WITH_SPAN_SIZE,
            ));
        }

        // SAFETY: length checked above
        let span = u64::from_le_bytes(
            data[..SPAN_SIZE]
                .try_into()
                .map_err(|_| ChunkError::format("insufficient data for span"))?,
        );

        Ok(Self {
            span,
            data,
            cached_address: OnceLock::new(),
        })
    }

    /// Create a chunk from its stored form with a known address.
    ///
    /// The address is trusted without re-derivation; use [`Self::verify`]
    /// when the data comes from an untrusted source.
    pub fn with_address(data: impl Into<Bytes>, address: ChunkAddress) -> Result<Self> {
        let chunk = Self::from_data(data)?;
        let _ = chunk.cached_address.set(address);
        Ok(chunk)
    }

    /// The chunk's span
    pub fn span(&self) -> u64 {
        self.span
    }

    /// The chunk's payload (data without the span prefix)
    pub fn payload(&self) -> Bytes {
        self.data.slice(SPAN_SIZE..)
    }

    /// The complete stored form, `span ‖ payload`
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The chunk's address, computed on first use
    pub fn address(&self) -> ChunkAddress {
        *self.cached_address.get_or_init(|| {
            // Payload length was validated on construction, the hash
            // cannot fail.
            BmtHasher::with_span(self.span)
                .hash(&self.data[SPAN_SIZE..])
                .unwrap_or_default()
        })
    }

    /// Re-derive the address from the content and compare it to `expected`.
    pub fn verify(&self, expected: &ChunkAddress) -> Result<()> {
        let actual = BmtHasher::with_span(self.span).hash(&self.data[SPAN_SIZE..])?;
        if actual != *expected {
            return Err(ChunkError::Verification {
                expected: *expected,
                actual,
            });
        }
        Ok(())
    }
}

impl PartialEq for ContentChunk {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for ContentChunk {}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn new_roundtrips_through_data() {
        let chunk = ContentChunk::new(5, vec![1u8, 2, 3, 4, 5]).unwrap();
        let restored = ContentChunk::from_data(chunk.data().clone()).unwrap();
        assert_eq!(restored.span(), 5);
        assert_eq!(restored.payload().as_ref(), &[1, 2, 3, 4, 5]);
        assert_eq!(chunk.address(), restored.address());
    }

    #[test]
    fn oversize_payload_rejected() {
        assert_matches!(
            ContentChunk::new(0, vec![0u8; CHUNK_SIZE + 1]),
            Err(ChunkError::Size { .. })
        );
    }

    #[test]
    fn short_data_rejected() {
        assert_matches!(
            ContentChunk::from_data(vec![0u8; SPAN_SIZE - 1]),
            Err(ChunkError::Format { .. })
        );
    }

    #[test]
    fn verify_detects_mismatch() {
        let chunk = ContentChunk::new(3, vec![1u8, 2, 3]).unwrap();
        let bogus = ChunkAddress::new([0xee; 32]);
        assert_matches!(chunk.verify(&bogus), Err(ChunkError::Verification { .. }));
        assert!(chunk.verify(&chunk.address()).is_ok());
    }

    #[test]
    fn trusted_address_is_not_rederived() {
        let claimed = ChunkAddress::new([0x11; 32]);
        let chunk = ContentChunk::with_address(8u64.to_le_bytes().to_vec(), claimed).unwrap();
        assert_eq!(chunk.address(), claimed);
    }
}
