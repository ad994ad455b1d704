//! Erasure tables mapping shard counts to parity counts.

use super::error::{RedundancyError, Result};

/// Maps the number of data shards in a group to the number of parity
/// shards generated for it.
///
/// Both columns are strictly descending; entry `k` applies to any group of
/// at least `shards[k]` members. Groups smaller than the smallest threshold
/// get no parity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErasureTable {
    shards: Vec<usize>,
    parities: Vec<usize>,
}

impl ErasureTable {
    /// Build a table, validating the descending invariant.
    pub fn new(shards: Vec<usize>, parities: Vec<usize>) -> Result<Self> {
        if shards.len() != parities.len() {
            return Err(RedundancyError::MalformedTable {
                reason: "shard and parity columns differ in length",
            });
        }
        if shards.is_empty() {
            return Err(RedundancyError::MalformedTable {
                reason: "table must have at least one row",
            });
        }
        if !strictly_descending(&shards) {
            return Err(RedundancyError::MalformedTable {
                reason: "shard column must be strictly descending",
            });
        }
        if !strictly_descending(&parities) {
            return Err(RedundancyError::MalformedTable {
                reason: "parity column must be strictly descending",
            });
        }

        Ok(Self { shards, parities })
    }

    /// Number of parity shards for a group of `shards` data members.
    pub fn optimal_parities(&self, shards: usize) -> usize {
        self.shards
            .iter()
            .zip(&self.parities)
            .find(|(threshold, _)| shards >= **threshold)
            .map_or(0, |(_, parities)| *parities)
    }

    /// The largest parity count the table can produce.
    pub fn max_parities(&self) -> usize {
        self.parities.first().copied().unwrap_or(0)
    }
}

fn strictly_descending(values: &[usize]) -> bool {
    values.windows(2).all(|pair| pair[0] > pair[1])
}
