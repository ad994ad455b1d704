//! Redundancy levels and fetch strategies.

use once_cell::sync::Lazy;
use strum::{Display, EnumString};

use vertex_file_primitives::constants::{BMT_BRANCHES, ENC_REFERENCE_SIZE, REFERENCE_SIZE};

use super::table::ErasureTable;

/// Encode-time loss-tolerance tier.
///
/// Each level reserves parity slots inside intermediate chunks; higher
/// levels tolerate more missing chunks per sibling group at the price of
/// storage overhead. Encrypted children take 64-byte references while
/// parity references stay 32 bytes, so each level carries a second table
/// for encrypted groups (`2*S + P <= 128` slots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RedundancyLevel {
    /// No parity chunks
    #[default]
    None,
    /// Tolerates ~1% chunk loss per group
    Medium,
    /// Tolerates ~5% chunk loss per group
    Strong,
    /// Tolerates ~10% chunk loss per group
    Insane,
    /// Tolerates ~50% chunk loss per group
    Paranoid,
}

/// Read-time fetch policy for one shard group.
///
/// Independent of the level the tree was encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RedundancyStrategy {
    /// Fetch data shards only (same behaviour as `Data`)
    #[default]
    None,
    /// Fetch data shards only; parity is touched only via fallback
    Data,
    /// Proximity-ordered fetch. Unimplemented upstream; behaves like
    /// `Data`.
    Prox,
    /// Race all data and parity lookups, first `S` responses win
    Race,
}

impl RedundancyLevel {
    /// Largest parity count the level produces (for a full group).
    pub fn max_parities(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Medium => 9,
            Self::Strong => 21,
            Self::Insane => 31,
            Self::Paranoid => 90,
        }
    }

    /// Largest data shard count per group with plain (32-byte) references.
    pub fn max_shards(&self) -> usize {
        BMT_BRANCHES - self.max_parities()
    }

    /// Largest data shard count per group with encrypted (64-byte)
    /// references.
    pub fn max_enc_shards(&self) -> usize {
        (BMT_BRANCHES * REFERENCE_SIZE - self.max_parities() * REFERENCE_SIZE)
            / ENC_REFERENCE_SIZE
    }

    /// Child capacity of an intermediate chunk under this level.
    pub fn capacity(&self, encrypted: bool) -> usize {
        match (self, encrypted) {
            (Self::None, false) => BMT_BRANCHES,
            (Self::None, true) => BMT_BRANCHES / 2,
            (_, false) => self.max_shards(),
            (_, true) => self.max_enc_shards(),
        }
    }

    /// The erasure table for this level and reference kind.
    ///
    /// Returns `None` for [`RedundancyLevel::None`].
    pub fn table(&self, encrypted: bool) -> Option<&'static ErasureTable> {
        let tables: &(Lazy<ErasureTable>, Lazy<ErasureTable>) = match self {
            Self::None => return None,
            Self::Medium => &MEDIUM,
            Self::Strong => &STRONG,
            Self::Insane => &INSANE,
            Self::Paranoid => &PARANOID,
        };
        Some(if encrypted { &tables.1 } else { &tables.0 })
    }

    /// Parity count for a group of `shards` data members.
    pub fn parities(&self, shards: usize, encrypted: bool) -> usize {
        self.table(encrypted)
            .map_or(0, |table| table.optimal_parities(shards))
    }
}

/// A table column pair is validated at first use; the constants below are
/// static and the constructor invariant cannot fail for them.
#[allow(clippy::expect_used)]
fn build(shards: &[usize], parities: &[usize]) -> ErasureTable {
    ErasureTable::new(shards.to_vec(), parities.to_vec())
        .expect("static erasure table must be well-formed")
}

type TablePair = (Lazy<ErasureTable>, Lazy<ErasureTable>);

static MEDIUM: TablePair = (
    Lazy::new(|| build(&[94, 68, 46, 28, 14, 5, 1], &[9, 8, 7, 6, 5, 4, 3])),
    Lazy::new(|| build(&[47, 34, 23, 14, 7, 2, 1], &[9, 8, 7, 6, 5, 4, 3])),
);

static STRONG: TablePair = (
    Lazy::new(|| {
        build(
            &[104, 95, 86, 77, 69, 61, 53, 46, 39, 32, 26, 20, 15, 10, 6, 3, 1],
            &[21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5],
        )
    }),
    Lazy::new(|| {
        build(
            &[52, 48, 44, 40, 36, 32, 29, 26, 23, 20, 17, 14, 11, 9, 7, 4, 1],
            &[21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5],
        )
    }),
);

static INSANE: TablePair = (
    Lazy::new(|| {
        build(
            &[
                92, 87, 82, 77, 73, 68, 63, 59, 54, 50, 45, 41, 37, 33, 30, 26, 23, 19, 16, 13,
                10, 8, 5, 3, 1,
            ],
            &[
                31, 30, 29, 28, 27, 26, 25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12,
                11, 10, 9, 8, 7,
            ],
        )
    }),
    Lazy::new(|| {
        build(
            &[
                46, 44, 42, 40, 38, 36, 34, 32, 30, 28, 26, 24, 22, 20, 18, 16, 14, 12, 10, 8, 6,
                5, 3, 2, 1,
            ],
            &[
                31, 30, 29, 28, 27, 26, 25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12,
                11, 10, 9, 8, 7,
            ],
        )
    }),
);

static PARANOID: TablePair = (
    Lazy::new(|| {
        build(
            &[37, 34, 31, 28, 25, 22, 19, 16, 13, 11, 9, 7, 5, 3, 1],
            &[90, 88, 86, 84, 82, 80, 75, 70, 64, 57, 49, 40, 30, 19, 7],
        )
    }),
    Lazy::new(|| {
        build(
            &[18, 16, 14, 13, 11, 10, 8, 7, 6, 5, 4, 3, 2, 1],
            &[90, 88, 86, 84, 82, 80, 75, 70, 64, 57, 49, 40, 30, 19],
        )
    }),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_fill_the_chunk() {
        // Plain groups: S + P slots of 32 bytes each.
        for level in [
            RedundancyLevel::Medium,
            RedundancyLevel::Strong,
            RedundancyLevel::Insane,
            RedundancyLevel::Paranoid,
        ] {
            assert_eq!(level.max_shards() + level.max_parities(), BMT_BRANCHES);
            // Encrypted groups: 2*S + P slots must fit 128.
            assert!(2 * level.max_enc_shards() + level.max_parities() <= BMT_BRANCHES);
        }
    }

    #[test]
    fn expected_shard_counts() {
        assert_eq!(RedundancyLevel::Medium.max_shards(), 119);
        assert_eq!(RedundancyLevel::Strong.max_shards(), 107);
        assert_eq!(RedundancyLevel::Insane.max_shards(), 97);
        assert_eq!(RedundancyLevel::Paranoid.max_shards(), 38);

        assert_eq!(RedundancyLevel::Medium.max_enc_shards(), 59);
        assert_eq!(RedundancyLevel::Strong.max_enc_shards(), 53);
        assert_eq!(RedundancyLevel::Insane.max_enc_shards(), 48);
        assert_eq!(RedundancyLevel::Paranoid.max_enc_shards(), 19);
    }

    #[test]
    fn full_groups_get_max_parities() {
        for level in [
            RedundancyLevel::Medium,
            RedundancyLevel::Strong,
            RedundancyLevel::Insane,
            RedundancyLevel::Paranoid,
        ] {
            assert_eq!(
                level.parities(level.max_shards(), false),
                level.max_parities()
            );
            assert_eq!(
                level.parities(level.max_enc_shards(), true),
                level.max_parities()
            );
        }
    }

    #[test]
    fn level_none_has_no_table() {
        assert!(RedundancyLevel::None.table(false).is_none());
        assert_eq!(RedundancyLevel::None.parities(128, false), 0);
        assert_eq!(RedundancyLevel::None.capacity(false), 128);
        assert_eq!(RedundancyLevel::None.capacity(true), 64);
    }

    #[test]
    fn groups_stay_within_field_limit() {
        // GF(2^8) coding addresses at most 256 symbols.
        for level in [
            RedundancyLevel::Medium,
            RedundancyLevel::Strong,
            RedundancyLevel::Insane,
            RedundancyLevel::Paranoid,
        ] {
            assert!(level.max_shards() + level.max_parities() <= 256);
        }
    }

    #[test]
    fn parses_from_str() {
        assert_eq!(
            "medium".parse::<RedundancyLevel>().unwrap(),
            RedundancyLevel::Medium
        );
        assert_eq!(
            "race".parse::<RedundancyStrategy>().unwrap(),
            RedundancyStrategy::Race
        );
    }
}
