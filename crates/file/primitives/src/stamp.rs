//! Postage stamps.
//!
//! Every chunk written to the network carries a stamp proving payment
//! against a postage batch. The batch accounting itself lives outside this
//! layer; the [`Stamper`] collaborator produces stamps and the pipeline
//! attaches them before persisting a chunk.

use alloy_primitives::B256;
use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::chunk::ChunkAddress;

/// Identifier of a postage batch
pub type BatchId = B256;

/// Size of a stamp signature in bytes (ECDSA recoverable)
pub const STAMP_SIGNATURE_SIZE: usize = 65;

/// Number of leading address bits selecting a stamp bucket
pub const BUCKET_DEPTH: u32 = 16;

/// Errors raised while producing or validating stamps
#[derive(Error, Debug)]
pub enum StampError {
    /// The signature has the wrong length
    #[error("invalid signature length {size}, expected {expected}")]
    InvalidSignatureLength {
        /// Length of the offending signature
        size: usize,
        /// Expected length
        expected: usize,
    },

    /// The stamper refused to stamp the chunk
    #[error("stamping rejected: {reason}")]
    Rejected {
        /// Why the stamp was refused
        reason: String,
    },
}

/// Proof of payment attached to a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostageStamp {
    batch_id: BatchId,
    bucket_index: u32,
    bucket_slot: u32,
    timestamp: u64,
    signature: Bytes,
}

impl PostageStamp {
    /// Creates a new `PostageStamp`
    pub fn new(
        batch_id: BatchId,
        bucket_index: u32,
        bucket_slot: u32,
        timestamp: u64,
        signature: impl Into<Bytes>,
    ) -> Result<Self, StampError> {
        let signature = signature.into();
        if signature.len() != STAMP_SIGNATURE_SIZE {
            return Err(StampError::InvalidSignatureLength {
                size: signature.len(),
                expected: STAMP_SIGNATURE_SIZE,
            });
        }

        Ok(Self {
            batch_id,
            bucket_index,
            bucket_slot,
            timestamp,
            signature,
        })
    }

    /// The `batch_id` of the stamp
    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    /// The bucket the stamped chunk falls into
    pub fn bucket_index(&self) -> u32 {
        self.bucket_index
    }

    /// The slot within the bucket
    pub fn bucket_slot(&self) -> u32 {
        self.bucket_slot
    }

    /// Stamp issuance timestamp
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The owner signature over the stamped fields
    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Serialize the stamp to its wire form
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            32 + 4 + 4 + 8 + STAMP_SIGNATURE_SIZE,
        );
        buf.extend_from_slice(self.batch_id.as_slice());
        buf.extend_from_slice(&self.bucket_index.to_be_bytes());
        buf.extend_from_slice(&self.bucket_slot.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.signature);
        buf.freeze()
    }
}

/// Derive the postage bucket a chunk address falls into.
pub fn bucket_index(address: &ChunkAddress) -> u32 {
    let bytes = address.as_bytes();
    // SAFETY: an address is always 32 bytes
    let prefix = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    prefix >> (32 - BUCKET_DEPTH)
}

/// Postage stamping collaborator.
///
/// A stamping failure is fatal to the pipeline for the chunk in question;
/// the caller aborts the whole operation.
pub trait Stamper: Send + Sync {
    /// Produce a stamp for the chunk with the given address.
    fn stamp(&self, address: &ChunkAddress) -> Result<PostageStamp, StampError>;
}

/// Stamper issuing unsigned stamps against a fixed batch.
///
/// Suitable for tests and for local stores that do not validate stamp
/// signatures.
#[derive(Debug, Clone, Default)]
pub struct NoopStamper {
    batch_id: BatchId,
}

impl NoopStamper {
    /// Create a stamper for the given batch
    pub fn new(batch_id: BatchId) -> Self {
        Self { batch_id }
    }
}

impl Stamper for NoopStamper {
    fn stamp(&self, address: &ChunkAddress) -> Result<PostageStamp, StampError> {
        PostageStamp::new(
            self.batch_id,
            bucket_index(address),
            0,
            0,
            vec![0u8; STAMP_SIGNATURE_SIZE],
        )
    }
}
