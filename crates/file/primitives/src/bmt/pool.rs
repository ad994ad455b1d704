//! Bounded worker pool for BMT hashing.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;

use super::error::{BmtError, Result};
use super::hasher;
use crate::chunk::ChunkAddress;

/// Default pool capacity multiplier over the logical CPU count.
const DEFAULT_CAPACITY_PER_CPU: usize = 4;

/// A bounded pool for concurrent BMT hashing.
///
/// Many chunks may be hashed concurrently, but the number of in-flight hash
/// jobs is capped by a counting semaphore so a wide fan-out cannot exhaust
/// the blocking thread pool. The pool is an explicit, caller-owned resource:
/// construct one per pipeline (or share a clone across pipelines) instead of
/// relying on process-wide state.
#[derive(Debug, Clone)]
pub struct BmtPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl BmtPool {
    /// Create a pool admitting at most `capacity` concurrent hash jobs.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Create a pool with the default capacity of 4x the logical CPU count.
    pub fn with_default_capacity() -> Self {
        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(DEFAULT_CAPACITY_PER_CPU * cpus)
    }

    /// The maximum number of concurrent hash jobs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Compute the chunk address for `(span, data)` on the blocking pool.
    ///
    /// Waits for a permit when the pool is saturated, providing backpressure
    /// to callers hashing sibling subtrees in parallel.
    pub async fn chunk_address(&self, span: u64, data: Bytes) -> Result<ChunkAddress> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BmtError::PoolUnavailable)?;

        tokio::task::spawn_blocking(move || hasher::chunk_address(span, &data))
            .await
            .map_err(|_| BmtError::PoolUnavailable)?
    }
}

impl Default for BmtPool {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
