//! Chunk references.
//!
//! A reference identifies a chunk within a tree: 32 bytes (the address) for
//! plaintext children, 64 bytes (`address ‖ decryption key`) for encrypted
//! children. An intermediate chunk's payload is a dense packed array of
//! references, data references first, parity references appended when
//! redundancy is active.

use alloy_primitives::{hex, B256};
use bytes::{Bytes, BytesMut};

use crate::chunk::{ChunkAddress, ChunkError, Result};
use crate::constants::{ADDRESS_SIZE, ENC_REFERENCE_SIZE, REFERENCE_SIZE};

/// Symmetric key used to decrypt a chunk's `span ‖ payload`.
pub type EncryptionKey = B256;

/// A reference to a chunk, optionally carrying its decryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    address: ChunkAddress,
    key: Option<EncryptionKey>,
}

impl Reference {
    /// Create a plain (unencrypted) reference
    pub fn plain(address: ChunkAddress) -> Self {
        Self { address, key: None }
    }

    /// Create an encrypted reference
    pub fn encrypted(address: ChunkAddress, key: EncryptionKey) -> Self {
        Self {
            address,
            key: Some(key),
        }
    }

    /// The referenced chunk's address
    pub fn address(&self) -> ChunkAddress {
        self.address
    }

    /// The decryption key, when the referenced chunk is encrypted
    pub fn key(&self) -> Option<&EncryptionKey> {
        self.key.as_ref()
    }

    /// Whether this reference carries a decryption key
    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    /// Wire size of this reference in bytes (32 plain, 64 encrypted)
    pub fn size(&self) -> usize {
        if self.key.is_some() {
            ENC_REFERENCE_SIZE
        } else {
            REFERENCE_SIZE
        }
    }

    /// Serialize to the wire form
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.extend_from_slice(self.address.as_bytes());
        if let Some(key) = &self.key {
            buf.extend_from_slice(key.as_slice());
        }
        buf.freeze()
    }

    /// Parse a reference from its wire form.
    ///
    /// Any length other than 32 or 64 bytes is a validation error.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        match slice.len() {
            REFERENCE_SIZE => Ok(Self::plain(ChunkAddress::from_slice(slice)?)),
            ENC_REFERENCE_SIZE => {
                let address = ChunkAddress::from_slice(&slice[..ADDRESS_SIZE])?;
                let key = B256::from_slice(&slice[ADDRESS_SIZE..]);
                Ok(Self::encrypted(address, key))
            }
            len => Err(ChunkError::size(
                "reference must be 32 or 64 bytes",
                len,
                ENC_REFERENCE_SIZE,
            )),
        }
    }
}

impl From<ChunkAddress> for Reference {
    fn from(address: ChunkAddress) -> Self {
        Self::plain(address)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// A member of an erasure-coded sibling group at one tree level.
///
/// An ordered list of these, data shards first and parity shards after,
/// describes how one intermediate chunk's children were coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardReference {
    /// The shard's chunk reference
    pub reference: Reference,
    /// Whether the shard is a parity chunk rather than tree data
    pub is_parity: bool,
}

impl ShardReference {
    /// A data shard
    pub fn data(reference: Reference) -> Self {
        Self {
            reference,
            is_parity: false,
        }
    }

    /// A parity shard
    pub fn parity(reference: Reference) -> Self {
        Self {
            reference,
            is_parity: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn plain_reference_wire_form() {
        let reference = Reference::plain(ChunkAddress::new([3; 32]));
        let bytes = reference.to_bytes();
        assert_eq!(bytes.len(), REFERENCE_SIZE);
        assert_eq!(Reference::from_slice(&bytes).unwrap(), reference);
    }

    #[test]
    fn encrypted_reference_wire_form() {
        let reference = Reference::encrypted(ChunkAddress::new([3; 32]), B256::repeat_byte(7));
        let bytes = reference.to_bytes();
        assert_eq!(bytes.len(), ENC_REFERENCE_SIZE);
        let parsed = Reference::from_slice(&bytes).unwrap();
        assert_eq!(parsed, reference);
        assert!(parsed.is_encrypted());
    }

    #[test]
    fn bad_length_rejected() {
        assert_matches!(Reference::from_slice(&[0u8; 33]), Err(ChunkError::Size { .. }));
        assert_matches!(Reference::from_slice(&[]), Err(ChunkError::Size { .. }));
    }
}
