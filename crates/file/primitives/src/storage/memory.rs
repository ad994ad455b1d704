//! In-memory chunk store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::error::{StorageError, StorageResult};
use super::ChunkStore;
use crate::chunk::{AnyChunk, ChunkAddress};

/// Simple in-memory chunk store.
///
/// Useful for tests and for assembling uploads client-side before handing
/// chunks to a network store.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<ChunkAddress, AnyChunk>>,
}

impl MemoryChunkStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks currently held
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Whether a chunk with this address is held
    pub fn contains(&self, address: &ChunkAddress) -> bool {
        self.chunks.read().contains_key(address)
    }

    /// Snapshot of all stored addresses
    pub fn addresses(&self) -> Vec<ChunkAddress> {
        self.chunks.read().keys().copied().collect()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn try_get(
        &self,
        address: &ChunkAddress,
        token: &CancellationToken,
    ) -> StorageResult<Option<AnyChunk>> {
        if token.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        Ok(self.chunks.read().get(address).cloned())
    }

    async fn add(&self, chunk: AnyChunk) -> StorageResult<()> {
        let mut chunks = self.chunks.write();
        chunks.entry(chunk.address()).or_insert(chunk);
        Ok(())
    }

    async fn remove(&self, address: &ChunkAddress) -> StorageResult<bool> {
        Ok(self.chunks.write().remove(address).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ContentChunk;

    #[tokio::test]
    async fn add_is_idempotent() {
        let store = MemoryChunkStore::new();
        let chunk = ContentChunk::new(3, vec![1u8, 2, 3]).unwrap();

        store.add(chunk.clone().into()).await.unwrap();
        store.add(chunk.clone().into()).await.unwrap();
        assert_eq!(store.len(), 1);

        let token = CancellationToken::new();
        let found = store.try_get(&chunk.address(), &token).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = MemoryChunkStore::new();
        let chunk = ContentChunk::new(1, vec![9u8]).unwrap();
        let address = chunk.address();

        store.add(chunk.into()).await.unwrap();
        assert!(store.remove(&address).await.unwrap());
        assert!(!store.remove(&address).await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_lookup_fails() {
        let store = MemoryChunkStore::new();
        let token = CancellationToken::new();
        token.cancel();

        let address = ChunkAddress::zero();
        assert!(store.try_get(&address, &token).await.is_err());
    }
}
