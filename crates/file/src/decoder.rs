//! Erasure group resolution and recovery.
//!
//! A [`ParityDecoder`] owns one sibling group (data shards first, parity
//! shards after) and resolves as many members as the chosen strategy
//! needs. Once any `S` of the `S + P` shards are present the missing data
//! shards are reconstructed and re-verified against their addresses.

use std::collections::HashMap;

use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use vertex_file_primitives::constants::SPAN_SIZE;
use vertex_file_primitives::{
    chunk_address, AnyChunk, ChunkAddress, ChunkStore, ContentChunk, ShardReference, StorageError,
};
use vertex_file_redundancy::{reconstruct_data, RedundancyLevel, RedundancyStrategy};

use crate::error::{FileError, Result};

/// Resolver for one erasure-coded sibling group.
#[derive(Debug)]
pub struct ParityDecoder<S> {
    shards: Vec<ShardReference>,
    store: S,
    data_count: usize,
    token: CancellationToken,
    resolved: Vec<Option<AnyChunk>>,
    index: HashMap<ChunkAddress, usize>,
    recovered: bool,
}

impl<S: ChunkStore> ParityDecoder<S> {
    /// Track a shard group for resolution.
    ///
    /// Shards must be ordered data first, and the parity count must match
    /// what `level` produces for the group's data count.
    pub fn new(
        shards: Vec<ShardReference>,
        store: S,
        level: RedundancyLevel,
        encrypted: bool,
        token: CancellationToken,
    ) -> Result<Self> {
        let data_count = shards.iter().filter(|shard| !shard.is_parity).count();
        if shards
            .iter()
            .take(data_count)
            .any(|shard| shard.is_parity)
        {
            return Err(FileError::validation(
                "shard group must list data shards before parity shards",
            ));
        }

        let parity_count = shards.len() - data_count;
        let expected = level.parities(data_count, encrypted);
        if parity_count != expected {
            return Err(FileError::validation(format!(
                "group of {data_count} data shards carries {parity_count} parities, expected {expected}",
            )));
        }

        let index = shards
            .iter()
            .enumerate()
            .map(|(i, shard)| (shard.reference.address(), i))
            .collect();

        Ok(Self {
            resolved: vec![None; shards.len()],
            shards,
            store,
            data_count,
            token,
            index,
            recovered: false,
        })
    }

    /// Whether every data shard is resolved.
    pub fn are_data_chunks_ready(&self) -> bool {
        self.resolved
            .iter()
            .take(self.data_count)
            .all(Option::is_some)
    }

    /// Whether Reed-Solomon recovery ran on this group.
    pub fn is_recovery_performed(&self) -> bool {
        self.recovered
    }

    /// Shards not resolved yet, in group order.
    pub fn missing_shards(&self) -> Vec<ShardReference> {
        self.shards
            .iter()
            .zip(&self.resolved)
            .filter(|(_, slot)| slot.is_none())
            .map(|(shard, _)| *shard)
            .collect()
    }

    /// A resolved chunk by address.
    ///
    /// An address outside the group is [`FileError::NotFound`]; a tracked
    /// but unresolved address is [`FileError::InvalidState`].
    pub fn get_chunk(&self, address: &ChunkAddress) -> Result<AnyChunk> {
        let slot = self
            .index
            .get(address)
            .ok_or(FileError::NotFound { address: *address })?;
        self.resolved
            .get(*slot)
            .and_then(Clone::clone)
            .ok_or(FileError::InvalidState { address: *address })
    }

    /// Resolve the group's data shards under the given strategy.
    ///
    /// `Data` (and its aliases `None` and `Prox`) fetches data shards
    /// only; with `use_fallback` a shortfall widens to the full group and
    /// recovers. `Race` races every lookup and cancels the losers once
    /// any `S` shards are in.
    pub async fn try_fetch(
        &mut self,
        strategy: RedundancyStrategy,
        use_fallback: bool,
    ) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(FileError::Cancelled);
        }

        match strategy {
            RedundancyStrategy::None | RedundancyStrategy::Data => {
                self.fetch_data(use_fallback).await
            }
            RedundancyStrategy::Prox => {
                debug!("prox strategy not implemented, fetching data shards");
                self.fetch_data(use_fallback).await
            }
            RedundancyStrategy::Race => self.fetch_race().await,
        }
    }

    /// Resolve the whole group and recover anything missing.
    pub async fn try_fetch_and_recover(&mut self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(FileError::Cancelled);
        }
        self.fetch_slots(self.shards.len(), &self.token.clone())
            .await?;
        self.recover()
    }

    /// Copy resolved chunks into another store.
    ///
    /// Used after recovery to reseed chunks the network lost. Returns the
    /// number of chunks written.
    pub async fn add_resolved_to_store<D: ChunkStore>(
        &self,
        dest: &D,
        addresses: &[ChunkAddress],
    ) -> Result<usize> {
        let mut written = 0;
        for address in addresses {
            let chunk = self.get_chunk(address)?;
            dest.add(chunk).await?;
            written += 1;
        }
        Ok(written)
    }

    async fn fetch_data(&mut self, use_fallback: bool) -> Result<()> {
        let token = self.token.clone();
        self.fetch_slots(self.data_count, &token).await?;
        if self.are_data_chunks_ready() {
            return Ok(());
        }

        if !use_fallback {
            let have = self.resolved_count();
            return Err(FileError::InsufficientShards {
                have,
                need: self.data_count,
            });
        }

        trace!("data shards incomplete, widening to parity");
        self.fetch_slots(self.shards.len(), &token).await?;
        self.recover()
    }

    /// Fetch the first `limit` unresolved slots concurrently.
    async fn fetch_slots(&mut self, limit: usize, token: &CancellationToken) -> Result<()> {
        let store = &self.store;
        let mut lookups: FuturesUnordered<_> = self
            .shards
            .iter()
            .zip(&self.resolved)
            .enumerate()
            .take(limit)
            .filter(|(_, (_, slot))| slot.is_none())
            .map(|(i, (shard, _))| {
                let address = shard.reference.address();
                async move { (i, store.try_get(&address, token).await) }
            })
            .collect();

        let mut hits = Vec::new();
        while let Some((slot, outcome)) = lookups.next().await {
            match outcome {
                Ok(Some(chunk)) => hits.push((slot, chunk)),
                Ok(None) => trace!(slot, "shard not found"),
                Err(StorageError::Cancelled) => {
                    drop(lookups);
                    return Err(FileError::Cancelled);
                }
                Err(err) => debug!(slot, %err, "shard lookup failed"),
            }
        }
        drop(lookups);

        for (slot, chunk) in hits {
            self.resolved[slot] = Some(chunk);
        }
        Ok(())
    }

    /// Race every unresolved lookup, first `S` overall shards win.
    async fn fetch_race(&mut self) -> Result<()> {
        let child = self.token.child_token();
        let store = &self.store;

        let mut lookups: FuturesUnordered<_> = self
            .shards
            .iter()
            .zip(&self.resolved)
            .enumerate()
            .filter(|(_, (_, slot))| slot.is_none())
            .map(|(i, (shard, _))| {
                let address = shard.reference.address();
                let token = child.clone();
                async move { (i, store.try_get(&address, &token).await) }
            })
            .collect();

        let mut present = self.resolved_count();
        let mut hits = Vec::new();
        while let Some((slot, outcome)) = lookups.next().await {
            match outcome {
                Ok(Some(chunk)) => {
                    hits.push((slot, chunk));
                    present += 1;
                    if present >= self.data_count {
                        child.cancel();
                        break;
                    }
                }
                Ok(None) => trace!(slot, "shard not found"),
                // Losers report cancellation once the race is decided.
                Err(StorageError::Cancelled) => trace!(slot, "lookup cancelled"),
                Err(err) => debug!(slot, %err, "shard lookup failed"),
            }
        }
        drop(lookups);

        for (slot, chunk) in hits {
            self.resolved[slot] = Some(chunk);
        }

        if self.token.is_cancelled() {
            return Err(FileError::Cancelled);
        }
        self.recover()
    }

    /// Reconstruct missing data shards from whatever is resolved.
    fn recover(&mut self) -> Result<()> {
        if self.are_data_chunks_ready() {
            return Ok(());
        }

        let have = self.resolved_count();
        if have < self.data_count {
            return Err(FileError::InsufficientShards {
                have,
                need: self.data_count,
            });
        }

        let width = self
            .resolved
            .iter()
            .flatten()
            .map(AnyChunk::size)
            .max()
            .unwrap_or(0);

        let mut layout: Vec<Option<Vec<u8>>> = self
            .resolved
            .iter()
            .map(|slot| {
                slot.as_ref().map(|chunk| {
                    let mut bytes = chunk.data().to_vec();
                    bytes.resize(width, 0);
                    bytes
                })
            })
            .collect();

        reconstruct_data(&mut layout, self.data_count)?;

        for slot in 0..self.data_count {
            if self.resolved[slot].is_some() {
                continue;
            }
            let bytes = layout[slot].take().ok_or_else(|| {
                FileError::validation("reconstruction left a data shard unfilled")
            })?;
            if bytes.len() < SPAN_SIZE {
                return Err(FileError::validation("recovered shard shorter than a span"));
            }

            let span = u64::from_le_bytes(
                bytes[..SPAN_SIZE]
                    .try_into()
                    .map_err(|_| FileError::validation("recovered shard shorter than a span"))?,
            );
            let expected = self.shards[slot].reference.address();
            let actual = chunk_address(span, &bytes[SPAN_SIZE..])?;
            if actual != expected {
                return Err(FileError::Corruption {
                    address: expected,
                    actual,
                });
            }

            let chunk = ContentChunk::with_address(Bytes::from(bytes), expected)?;
            trace!(address = %expected, "data shard recovered");
            self.resolved[slot] = Some(chunk.into());
        }

        self.recovered = true;
        debug!(
            group = self.shards.len(),
            data = self.data_count,
            "erasure recovery complete"
        );
        Ok(())
    }

    fn resolved_count(&self) -> usize {
        self.resolved.iter().flatten().count()
    }
}
