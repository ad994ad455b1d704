//! Chunk storage collaborator.
//!
//! The [`ChunkStore`] trait is the boundary to whatever persists chunks: a
//! local database, a network retrieval protocol, or an in-memory map for
//! tests. A miss is a normal signal (`Ok(None)`), not an error.

mod error;
mod memory;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryChunkStore;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::chunk::{AnyChunk, ChunkAddress};

/// Chunk storage backend.
///
/// Implementations must be safe for concurrent calls and should return
/// promptly once the supplied cancellation token fires; no call may block
/// indefinitely.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Look up a chunk by address.
    ///
    /// Returns `Ok(None)` when the chunk is not present.
    async fn try_get(
        &self,
        address: &ChunkAddress,
        token: &CancellationToken,
    ) -> StorageResult<Option<AnyChunk>>;

    /// Persist a chunk. Idempotent by address.
    async fn add(&self, chunk: AnyChunk) -> StorageResult<()>;

    /// Remove a chunk, reporting whether it was present.
    async fn remove(&self, address: &ChunkAddress) -> StorageResult<bool>;
}

#[async_trait]
impl<S: ChunkStore + ?Sized> ChunkStore for Arc<S> {
    async fn try_get(
        &self,
        address: &ChunkAddress,
        token: &CancellationToken,
    ) -> StorageResult<Option<AnyChunk>> {
        (**self).try_get(address, token).await
    }

    async fn add(&self, chunk: AnyChunk) -> StorageResult<()> {
        (**self).add(chunk).await
    }

    async fn remove(&self, address: &ChunkAddress) -> StorageResult<bool> {
        (**self).remove(address).await
    }
}
