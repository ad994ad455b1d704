//! Span arithmetic over the chunk tree.
//!
//! Child counts and spans are derived from the parent span alone, never
//! from the payload length. Recovered chunks come back zero-padded to the
//! width of their erasure group, so the payload length is not trustworthy;
//! the span is, because it is covered by the address.

use bytes::Bytes;

use vertex_file_primitives::constants::{CHUNK_SIZE, ENC_REFERENCE_SIZE, REFERENCE_SIZE, SPAN_SIZE};
use vertex_file_primitives::{ChunkCipher, Reference, ShardReference};
use vertex_file_redundancy::RedundancyLevel;

use crate::error::{FileError, Result};

/// A chunk decoded to its plaintext `span` and payload.
pub(crate) struct PlainChunk {
    pub(crate) span: u64,
    pub(crate) payload: Bytes,
}

/// Decrypt (when the reference carries a key) and trim one stored chunk.
///
/// Leaf payloads are trimmed to their span; recovery may have padded
/// them. Intermediate payloads keep any padding for [`parse_group`] to
/// step over.
pub(crate) fn decode_chunk<C: ChunkCipher>(
    cipher: &C,
    stored: Bytes,
    reference: &Reference,
) -> Result<PlainChunk> {
    let plain = match reference.key() {
        Some(key) => cipher.decrypt(key, &stored),
        None => stored,
    };

    let span = u64::from_le_bytes(
        plain
            .get(..SPAN_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| FileError::validation("chunk shorter than its span field"))?,
    );
    let mut payload = plain.slice(SPAN_SIZE..);

    if span <= CHUNK_SIZE as u64 {
        if (payload.len() as u64) < span {
            return Err(FileError::validation("leaf payload shorter than its span"));
        }
        payload = payload.slice(..span as usize);
    }

    Ok(PlainChunk { span, payload })
}

/// One resolved sibling group: the children of an intermediate chunk.
#[derive(Debug, Clone)]
pub(crate) struct ChunkGroup {
    /// Data children with the byte span each covers
    pub(crate) data: Vec<(Reference, u64)>,
    /// Parity children, always plain references
    pub(crate) parity: Vec<Reference>,
}

impl ChunkGroup {
    /// The group layout as an ordered shard list, data first.
    pub(crate) fn shard_references(&self) -> Vec<ShardReference> {
        self.data
            .iter()
            .map(|(reference, _)| ShardReference::data(*reference))
            .chain(self.parity.iter().map(|r| ShardReference::parity(*r)))
            .collect()
    }
}

/// Bytes each direct child of a node covering `span` bytes accounts for.
///
/// The last child may cover less; a promoted carrier chunk covers whatever
/// its own span says, which the subtraction below yields naturally.
pub(crate) fn child_coverage(span: u64, capacity: usize) -> u64 {
    let capacity = capacity as u64;
    let mut coverage = CHUNK_SIZE as u64;
    while coverage.saturating_mul(capacity) < span {
        coverage = coverage.saturating_mul(capacity);
    }
    coverage
}

/// Number of direct children of a node covering `span` bytes.
pub(crate) fn child_count(span: u64, capacity: usize) -> usize {
    span.div_ceil(child_coverage(span, capacity)) as usize
}

/// Parse an intermediate chunk's payload into its sibling group.
///
/// `span` must exceed [`CHUNK_SIZE`]; the payload may carry recovery
/// padding beyond the last parity reference, which is ignored.
pub(crate) fn parse_group(
    span: u64,
    payload: &[u8],
    capacity: usize,
    encrypted: bool,
    level: RedundancyLevel,
) -> Result<ChunkGroup> {
    let stride = if encrypted {
        ENC_REFERENCE_SIZE
    } else {
        REFERENCE_SIZE
    };

    let coverage = child_coverage(span, capacity);
    let data_count = span.div_ceil(coverage) as usize;
    let parity_count = level.parities(data_count, encrypted);

    let need = data_count * stride + parity_count * REFERENCE_SIZE;
    if payload.len() < need {
        return Err(FileError::validation(format!(
            "intermediate payload of {} bytes cannot hold {data_count} children and {parity_count} parities",
            payload.len(),
        )));
    }

    let mut data = Vec::with_capacity(data_count);
    for index in 0..data_count {
        let offset = index * stride;
        let reference = Reference::from_slice(&payload[offset..offset + stride])?;
        let child_span = coverage.min(span - index as u64 * coverage);
        data.push((reference, child_span));
    }

    let mut parity = Vec::with_capacity(parity_count);
    let parity_base = data_count * stride;
    for index in 0..parity_count {
        let offset = parity_base + index * REFERENCE_SIZE;
        parity.push(Reference::from_slice(
            &payload[offset..offset + REFERENCE_SIZE],
        )?);
    }

    Ok(ChunkGroup { data, parity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertex_file_primitives::ChunkAddress;

    const CHUNK: u64 = CHUNK_SIZE as u64;

    #[test]
    fn coverage_grows_by_powers_of_capacity() {
        assert_eq!(child_coverage(CHUNK + 1, 128), CHUNK);
        assert_eq!(child_coverage(128 * CHUNK, 128), CHUNK);
        assert_eq!(child_coverage(128 * CHUNK + 1, 128), 128 * CHUNK);
        assert_eq!(child_coverage(128 * 128 * CHUNK + 1, 128), 128 * 128 * CHUNK);
    }

    #[test]
    fn carrier_child_gets_the_remainder() {
        // 128 full leaves plus a 100-byte carrier: the root has two
        // children, the second covering only the carrier's own span.
        let span = 128 * CHUNK + 100;
        let coverage = child_coverage(span, 128);
        assert_eq!(coverage, 128 * CHUNK);
        assert_eq!(child_count(span, 128), 2);
        assert_eq!(coverage.min(span - coverage), 100);
    }

    #[test]
    fn parses_plain_group() {
        let span = 3 * CHUNK;
        let mut payload = Vec::new();
        for byte in 1u8..=3 {
            payload.extend_from_slice(&[byte; REFERENCE_SIZE]);
        }

        let group = parse_group(span, &payload, 128, false, RedundancyLevel::None).unwrap();
        assert_eq!(group.data.len(), 3);
        assert!(group.parity.is_empty());
        assert_eq!(group.data[0].0.address(), ChunkAddress::new([1; 32]));
        assert!(group.data.iter().all(|(_, s)| *s == CHUNK));
    }

    #[test]
    fn parses_parity_references_after_data() {
        let span = 5 * CHUNK;
        let parities = RedundancyLevel::Medium.parities(5, false);
        assert_eq!(parities, 4);

        let mut payload = Vec::new();
        for byte in 1u8..=5 {
            payload.extend_from_slice(&[byte; REFERENCE_SIZE]);
        }
        for byte in 10u8..10 + parities as u8 {
            payload.extend_from_slice(&[byte; REFERENCE_SIZE]);
        }
        // Recovery padding past the group must be ignored.
        payload.extend_from_slice(&[0u8; 17]);

        let group = parse_group(span, &payload, 119, false, RedundancyLevel::Medium).unwrap();
        assert_eq!(group.data.len(), 5);
        assert_eq!(group.parity.len(), 4);
        assert_eq!(group.parity[0].address(), ChunkAddress::new([10; 32]));
        assert_eq!(group.shard_references().len(), 9);
        assert!(group.shard_references()[5].is_parity);
    }

    #[test]
    fn truncated_payload_rejected() {
        let span = 3 * CHUNK;
        let payload = vec![0u8; 2 * REFERENCE_SIZE];
        assert!(parse_group(span, &payload, 128, false, RedundancyLevel::None).is_err());
    }
}
