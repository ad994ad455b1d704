//! Symmetric chunk encryption.
//!
//! Uploads can be encrypted all-or-nothing: every chunk gets its own random
//! 32-byte key, applied over the chunk's `span ‖ payload`, and the key
//! becomes part of the (64-byte) reference. The cipher must be
//! length-preserving and positionwise so that zero-padding during parity
//! recovery commutes with decryption.

use alloy_primitives::{Keccak256, B256};
use bytes::{Bytes, BytesMut};
use rand::RngCore;

use crate::constants::HASH_SIZE;
use crate::reference::EncryptionKey;

/// Symmetric cipher applied per chunk.
pub trait ChunkCipher: Send + Sync {
    /// Encrypt `plaintext` under `key`. Output length equals input length.
    fn encrypt(&self, key: &EncryptionKey, plaintext: &[u8]) -> Bytes;

    /// Decrypt `ciphertext` under `key`. Inverse of [`Self::encrypt`].
    fn decrypt(&self, key: &EncryptionKey, ciphertext: &[u8]) -> Bytes;
}

/// Keccak counter keystream cipher.
///
/// Block `j` of the keystream is `keccak256(key ‖ j_le)`; data is XORed
/// against the stream. Encryption and decryption are the same operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeystreamCipher;

impl KeystreamCipher {
    fn apply(key: &EncryptionKey, data: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(data.len());

        for (block_index, block) in data.chunks(HASH_SIZE).enumerate() {
            let mut hasher = Keccak256::new();
            hasher.update(key.as_slice());
            hasher.update((block_index as u64).to_le_bytes());
            let pad = hasher.finalize();

            out.extend(block.iter().zip(pad.as_slice()).map(|(b, p)| b ^ p));
        }

        out.freeze()
    }
}

impl ChunkCipher for KeystreamCipher {
    fn encrypt(&self, key: &EncryptionKey, plaintext: &[u8]) -> Bytes {
        Self::apply(key, plaintext)
    }

    fn decrypt(&self, key: &EncryptionKey, ciphertext: &[u8]) -> Bytes {
        Self::apply(key, ciphertext)
    }
}

/// Generate a fresh random chunk encryption key.
pub fn random_key() -> EncryptionKey {
    let mut bytes = [0u8; HASH_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    B256::from(bytes)
}
