//! Upload and download configuration.

use vertex_file_redundancy::{RedundancyLevel, RedundancyStrategy};

/// Smallest child count an intermediate chunk may be sized for.
const MIN_CAPACITY: usize = 2;

/// Configuration for a split (upload) pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOptions {
    /// Redundancy level the tree is encoded with
    pub level: RedundancyLevel,
    /// Encrypt every chunk with a per-chunk random key
    pub encrypt: bool,
    /// Capacity reduction applied to every intermediate chunk.
    ///
    /// `0` builds the canonical tree; each step above that narrows the
    /// fan-out by one child, down to a floor of two.
    pub compact_level: usize,
}

impl UploadOptions {
    /// Options for an unencrypted, unprotected upload
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the redundancy level
    pub fn with_level(mut self, level: RedundancyLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable per-chunk encryption
    pub fn with_encryption(mut self) -> Self {
        self.encrypt = true;
        self
    }

    /// Set the fan-out compaction
    pub fn with_compact_level(mut self, compact_level: usize) -> Self {
        self.compact_level = compact_level;
        self
    }

    /// Data children an intermediate chunk holds under these options
    pub fn effective_capacity(&self) -> usize {
        effective_capacity(self.level, self.encrypt, self.compact_level)
    }
}

/// Configuration for a join (download) pipeline.
///
/// `level`, `encrypt` and `compact_level` must match the options the tree
/// was split with; `strategy` and `fallback` are free read-time choices.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadOptions {
    /// Fetch strategy applied to every erasure group
    pub strategy: RedundancyStrategy,
    /// Redundancy level the tree was encoded with
    pub level: RedundancyLevel,
    /// Fall back to parity fetch and recovery when data shards are missing
    pub fallback: bool,
    /// Fan-out compaction the tree was split with
    pub compact_level: usize,
}

impl DownloadOptions {
    /// Options reading an unprotected tree, with recovery fallback on
    pub fn new() -> Self {
        Self {
            fallback: true,
            ..Self::default()
        }
    }

    /// Set the fetch strategy
    pub fn with_strategy(mut self, strategy: RedundancyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the redundancy level the tree was encoded with
    pub fn with_level(mut self, level: RedundancyLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable recovery fallback
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the fan-out compaction the tree was split with
    pub fn with_compact_level(mut self, compact_level: usize) -> Self {
        self.compact_level = compact_level;
        self
    }

    /// Data children an intermediate chunk holds under these options
    pub fn effective_capacity(&self, encrypted: bool) -> usize {
        effective_capacity(self.level, encrypted, self.compact_level)
    }
}

/// Data children per intermediate chunk for a level, reference kind and
/// compaction, floored at two so the tree always converges.
pub fn effective_capacity(level: RedundancyLevel, encrypted: bool, compact_level: usize) -> usize {
    level
        .capacity(encrypted)
        .saturating_sub(compact_level)
        .max(MIN_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compaction_narrows_with_a_floor() {
        assert_eq!(effective_capacity(RedundancyLevel::None, false, 0), 128);
        assert_eq!(effective_capacity(RedundancyLevel::None, false, 28), 100);
        assert_eq!(effective_capacity(RedundancyLevel::None, false, 1000), 2);
        assert_eq!(effective_capacity(RedundancyLevel::Medium, false, 0), 119);
        assert_eq!(effective_capacity(RedundancyLevel::Medium, true, 0), 59);
    }

    #[test]
    fn download_defaults_enable_fallback() {
        let options = DownloadOptions::new();
        assert!(options.fallback);
        assert_eq!(options.strategy, RedundancyStrategy::None);
    }
}
