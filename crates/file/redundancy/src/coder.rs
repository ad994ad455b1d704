//! Systematic Reed-Solomon coding over GF(2^8).
//!
//! Shards are the full stored chunk bytes (`span ‖ payload`), zero-padded
//! to the widest member of the group. Parity shards are stored and
//! referenced exactly like data chunks.

use bytes::Bytes;
use reed_solomon_erasure::galois_8::ReedSolomon;

use super::error::{RedundancyError, Result};

/// Maximum symbols addressable by the GF(2^8) field.
const FIELD_LIMIT: usize = 256;

/// Encode `parities` parity shards over the given data shards.
///
/// Returns the parity shard bytes, each as wide as the widest data shard.
/// `parities == 0` yields an empty vector without touching the coder.
pub fn encode_parities(data_shards: &[Bytes], parities: usize) -> Result<Vec<Bytes>> {
    if parities == 0 || data_shards.is_empty() {
        return Ok(Vec::new());
    }

    let total = data_shards.len() + parities;
    if total > FIELD_LIMIT {
        return Err(RedundancyError::GroupTooLarge {
            total,
            limit: FIELD_LIMIT,
        });
    }

    let width = data_shards.iter().map(|s| s.len()).max().unwrap_or(0);

    let mut shards: Vec<Vec<u8>> = data_shards
        .iter()
        .map(|shard| {
            let mut padded = shard.to_vec();
            padded.resize(width, 0);
            padded
        })
        .collect();
    shards.resize(total, vec![0u8; width]);

    let coder = ReedSolomon::new(data_shards.len(), parities)?;
    coder.encode(&mut shards)?;

    Ok(shards
        .drain(data_shards.len()..)
        .map(Bytes::from)
        .collect())
}

/// Reconstruct missing data shards in place.
///
/// `shards` holds the full group layout (data first, then parity), with
/// `None` for missing members; present members must already share one
/// width. Only data shards are reconstructed; parity slots stay as given.
pub fn reconstruct_data(shards: &mut [Option<Vec<u8>>], data_count: usize) -> Result<()> {
    let parities = shards.len().saturating_sub(data_count);
    let coder = ReedSolomon::new(data_count, parities)?;
    coder.reconstruct_data(shards)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(count: usize, width: usize) -> Vec<Bytes> {
        (0..count)
            .map(|i| Bytes::from(vec![(i + 1) as u8; width]))
            .collect()
    }

    #[test]
    fn encode_produces_requested_parities() {
        let data = group(10, 64);
        let parity = encode_parities(&data, 4).unwrap();
        assert_eq!(parity.len(), 4);
        assert!(parity.iter().all(|shard| shard.len() == 64));
    }

    #[test]
    fn zero_parities_is_a_noop() {
        let data = group(3, 16);
        assert!(encode_parities(&data, 0).unwrap().is_empty());
    }

    #[test]
    fn oversized_group_rejected() {
        let data = group(200, 8);
        assert!(matches!(
            encode_parities(&data, 100),
            Err(RedundancyError::GroupTooLarge { .. })
        ));
    }

    #[test]
    fn recovers_any_loss_within_parity_budget() {
        let data = group(10, 32);
        let parity = encode_parities(&data, 4).unwrap();

        // Drop 4 members (3 data + 1 parity), still recoverable.
        let mut shards: Vec<Option<Vec<u8>>> = data
            .iter()
            .map(|s| Some(s.to_vec()))
            .chain(parity.iter().map(|s| Some(s.to_vec())))
            .collect();
        shards[1] = None;
        shards[4] = None;
        shards[9] = None;
        shards[11] = None;

        reconstruct_data(&mut shards, 10).unwrap();
        for (i, original) in data.iter().enumerate() {
            assert_eq!(shards[i].as_deref(), Some(original.as_ref()));
        }
    }

    #[test]
    fn fails_beyond_parity_budget() {
        let data = group(10, 32);
        let parity = encode_parities(&data, 4).unwrap();

        let mut shards: Vec<Option<Vec<u8>>> = data
            .iter()
            .map(|s| Some(s.to_vec()))
            .chain(parity.iter().map(|s| Some(s.to_vec())))
            .collect();
        for slot in shards.iter_mut().take(5) {
            *slot = None;
        }

        assert!(reconstruct_data(&mut shards, 10).is_err());
    }

    #[test]
    fn uneven_shards_are_padded() {
        let data = vec![
            Bytes::from(vec![1u8; 64]),
            Bytes::from(vec![2u8; 64]),
            Bytes::from(vec![3u8; 10]),
        ];
        let parity = encode_parities(&data, 2).unwrap();
        assert!(parity.iter().all(|shard| shard.len() == 64));

        // Recover the short member; it comes back zero-padded.
        let mut shards: Vec<Option<Vec<u8>>> = vec![
            Some(data[0].to_vec()),
            Some(data[1].to_vec()),
            None,
            Some(parity[0].to_vec()),
            Some(parity[1].to_vec()),
        ];
        reconstruct_data(&mut shards, 3).unwrap();
        let mut expected = data[2].to_vec();
        expected.resize(64, 0);
        assert_eq!(shards[2].as_deref(), Some(expected.as_slice()));
    }
}
