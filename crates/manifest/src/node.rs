//! Mantaray node deserialization.
//!
//! A mantaray node is stored as the payload of an ordinary content chunk.
//! The first 32 bytes are an obfuscation key; the remainder is XORed with
//! that key repeated. The deobfuscated remainder holds a 31-byte version
//! hash, a one-byte reference size, the node entry, a 256-bit fork bitmap
//! and one fork record per set bit, in ascending byte order.

use std::collections::BTreeMap;

use alloy_primitives::keccak256;
use once_cell::sync::Lazy;

use vertex_file_primitives::Reference;
use vertex_file_primitives::constants::{ENC_REFERENCE_SIZE, REFERENCE_SIZE};

use super::error::{ManifestError, Result};

/// Size of the obfuscation key prefixing every node.
pub const OBFUSCATION_KEY_SIZE: usize = 32;
/// Size of the truncated version hash.
const VERSION_HASH_SIZE: usize = 31;
/// Fixed header: obfuscation key, version hash and reference size byte.
const NODE_HEADER_SIZE: usize = OBFUSCATION_KEY_SIZE + VERSION_HASH_SIZE + 1;
/// Size of the fork presence bitmap (one bit per possible first byte).
const FORK_BITMAP_SIZE: usize = 32;
/// Largest prefix a single fork record can carry.
pub const FORK_PREFIX_MAX: usize = 30;
/// Fork record bytes before the reference: type, prefix length, prefix.
const FORK_PRE_REFERENCE_SIZE: usize = 2 + FORK_PREFIX_MAX;
/// Size of the metadata length field trailing a metadata fork.
const FORK_METADATA_LEN_SIZE: usize = 2;

static VERSION_HASH_01: Lazy<[u8; VERSION_HASH_SIZE]> = Lazy::new(|| version_hash("mantaray:0.1"));
static VERSION_HASH_02: Lazy<[u8; VERSION_HASH_SIZE]> = Lazy::new(|| version_hash("mantaray:0.2"));

fn version_hash(version: &str) -> [u8; VERSION_HASH_SIZE] {
    let digest = keccak256(version.as_bytes());
    let mut out = [0u8; VERSION_HASH_SIZE];
    out.copy_from_slice(&digest[..VERSION_HASH_SIZE]);
    out
}

/// Node type bits carried by each fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeType(u8);

impl NodeType {
    const VALUE: u8 = 2;
    const EDGE: u8 = 4;
    const WITH_PATH_SEPARATOR: u8 = 8;
    const WITH_METADATA: u8 = 16;

    /// The raw type byte.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// The fork reference resolves to stored data.
    pub fn is_value(&self) -> bool {
        self.0 & Self::VALUE != 0
    }

    /// The fork reference resolves to another manifest node.
    pub fn is_edge(&self) -> bool {
        self.0 & Self::EDGE != 0
    }

    /// The fork prefix ends on a path separator.
    pub fn has_path_separator(&self) -> bool {
        self.0 & Self::WITH_PATH_SEPARATOR != 0
    }

    /// The fork record carries trailing metadata.
    pub fn has_metadata(&self) -> bool {
        self.0 & Self::WITH_METADATA != 0
    }
}

impl From<u8> for NodeType {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

/// A single outgoing edge of a manifest node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    node_type: NodeType,
    prefix: Vec<u8>,
    reference: Reference,
}

impl Fork {
    /// Type bits of the fork.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Path bytes consumed by following this fork.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Reference to the fork target.
    pub fn reference(&self) -> &Reference {
        &self.reference
    }
}

/// A deserialized mantaray node.
///
/// Only the read shape is modeled; building and mutating tries is out of
/// scope. Metadata attached to forks is length-skipped, not decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestNode {
    ref_size: usize,
    entry: Option<Reference>,
    forks: BTreeMap<u8, Fork>,
}

impl ManifestNode {
    /// Deserialize a node from the payload of its chunk.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < NODE_HEADER_SIZE {
            return Err(ManifestError::Truncated {
                size: data.len(),
                need: NODE_HEADER_SIZE,
            });
        }

        let key = &data[..OBFUSCATION_KEY_SIZE];
        let plain = deobfuscate(&data[OBFUSCATION_KEY_SIZE..], key);

        let version = &plain[..VERSION_HASH_SIZE];
        if version != VERSION_HASH_01.as_slice() && version != VERSION_HASH_02.as_slice() {
            return Err(ManifestError::UnknownVersion);
        }

        let ref_size = plain[VERSION_HASH_SIZE] as usize;
        if ref_size != REFERENCE_SIZE && ref_size != ENC_REFERENCE_SIZE {
            return Err(ManifestError::InvalidReferenceSize { size: ref_size });
        }

        let mut cursor = VERSION_HASH_SIZE + 1;
        let entry_bytes = read(&plain, &mut cursor, ref_size)?;
        let entry = if entry_bytes.iter().all(|byte| *byte == 0) {
            None
        } else {
            Some(Reference::from_slice(entry_bytes)?)
        };

        let bitmap = read(&plain, &mut cursor, FORK_BITMAP_SIZE)?;
        let bitmap: [u8; FORK_BITMAP_SIZE] = {
            let mut out = [0u8; FORK_BITMAP_SIZE];
            out.copy_from_slice(bitmap);
            out
        };

        let mut forks = BTreeMap::new();
        for first_byte in 0..=u8::MAX {
            if !bit_set(&bitmap, first_byte) {
                continue;
            }
            let fork = parse_fork(&plain, &mut cursor, ref_size)?;
            forks.insert(first_byte, fork);
        }

        Ok(Self {
            ref_size,
            entry,
            forks,
        })
    }

    /// Reference size used by the entry and every fork, in bytes.
    pub fn ref_size(&self) -> usize {
        self.ref_size
    }

    /// Reference stored at this node, if any.
    pub fn entry(&self) -> Option<&Reference> {
        self.entry.as_ref()
    }

    /// Outgoing forks in ascending first-byte order.
    pub fn forks(&self) -> impl Iterator<Item = &Fork> {
        self.forks.values()
    }

    /// The fork whose prefix starts with `first_byte`, if present.
    pub fn fork(&self, first_byte: u8) -> Option<&Fork> {
        self.forks.get(&first_byte)
    }

    /// Number of outgoing forks.
    pub fn fork_count(&self) -> usize {
        self.forks.len()
    }
}

fn deobfuscate(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, byte)| byte ^ key[i % key.len()])
        .collect()
}

fn bit_set(bitmap: &[u8; FORK_BITMAP_SIZE], index: u8) -> bool {
    bitmap[usize::from(index) / 8] & (1 << (index % 8)) != 0
}

fn read<'a>(plain: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = *cursor + len;
    if end > plain.len() {
        return Err(ManifestError::Truncated {
            size: OBFUSCATION_KEY_SIZE + plain.len(),
            need: OBFUSCATION_KEY_SIZE + end,
        });
    }
    let out = &plain[*cursor..end];
    *cursor = end;
    Ok(out)
}

fn parse_fork(plain: &[u8], cursor: &mut usize, ref_size: usize) -> Result<Fork> {
    let offset = OBFUSCATION_KEY_SIZE + *cursor;
    let record_len = FORK_PRE_REFERENCE_SIZE + ref_size;
    if *cursor + record_len > plain.len() {
        return Err(ManifestError::TruncatedFork { offset });
    }

    let record = &plain[*cursor..*cursor + record_len];
    *cursor += record_len;

    let node_type = NodeType::from(record[0]);
    let prefix_len = record[1] as usize;
    if prefix_len == 0 || prefix_len > FORK_PREFIX_MAX {
        return Err(ManifestError::InvalidPrefixLength {
            len: prefix_len,
            max: FORK_PREFIX_MAX,
        });
    }
    let prefix = record[2..2 + prefix_len].to_vec();
    let reference = Reference::from_slice(&record[FORK_PRE_REFERENCE_SIZE..])?;

    if node_type.has_metadata() {
        if *cursor + FORK_METADATA_LEN_SIZE > plain.len() {
            return Err(ManifestError::TruncatedFork { offset });
        }
        let metadata_len =
            u16::from_be_bytes([plain[*cursor], plain[*cursor + 1]]) as usize;
        *cursor += FORK_METADATA_LEN_SIZE;
        if *cursor + metadata_len > plain.len() {
            return Err(ManifestError::TruncatedFork { offset });
        }
        // Metadata is JSON we have no use for here; skip it.
        *cursor += metadata_len;
    }

    Ok(Fork {
        node_type,
        prefix,
        reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use vertex_file_primitives::ChunkAddress;

    struct ForkSpec {
        node_type: u8,
        prefix: &'static [u8],
        reference: Vec<u8>,
        metadata: Option<Vec<u8>>,
    }

    fn build_node(
        key: [u8; OBFUSCATION_KEY_SIZE],
        version: &str,
        ref_size: usize,
        entry: &[u8],
        forks: &[ForkSpec],
    ) -> Vec<u8> {
        let mut plain = Vec::new();
        plain.extend_from_slice(&version_hash(version));
        plain.push(ref_size as u8);
        plain.extend_from_slice(entry);

        let mut bitmap = [0u8; FORK_BITMAP_SIZE];
        for fork in forks {
            let first = fork.prefix[0];
            bitmap[usize::from(first) / 8] |= 1 << (first % 8);
        }
        plain.extend_from_slice(&bitmap);

        for fork in forks {
            plain.push(fork.node_type);
            plain.push(fork.prefix.len() as u8);
            let mut prefix = fork.prefix.to_vec();
            prefix.resize(FORK_PREFIX_MAX, 0);
            plain.extend_from_slice(&prefix);
            plain.extend_from_slice(&fork.reference);
            if let Some(metadata) = &fork.metadata {
                plain.extend_from_slice(&(metadata.len() as u16).to_be_bytes());
                plain.extend_from_slice(metadata);
            }
        }

        let mut out = key.to_vec();
        out.extend(deobfuscate(&plain, &key));
        out
    }

    fn addr(byte: u8) -> Vec<u8> {
        vec![byte; REFERENCE_SIZE]
    }

    #[test]
    fn parses_entry_and_forks() {
        let forks = vec![
            ForkSpec {
                node_type: 2,
                prefix: b"index.html",
                reference: addr(0xaa),
                metadata: None,
            },
            ForkSpec {
                node_type: 4 | 16,
                prefix: b"assets/",
                reference: addr(0xbb),
                metadata: Some(b"{\"x\":1}".to_vec()),
            },
        ];
        let bytes = build_node([0u8; 32], "mantaray:0.2", REFERENCE_SIZE, &addr(0x11), &forks);

        let node = ManifestNode::from_bytes(&bytes).unwrap();
        assert_eq!(node.ref_size(), REFERENCE_SIZE);
        assert_eq!(
            node.entry().unwrap().address(),
            ChunkAddress::from_slice(&addr(0x11)).unwrap()
        );
        assert_eq!(node.fork_count(), 2);

        let value = node.fork(b'i').unwrap();
        assert!(value.node_type().is_value());
        assert!(!value.node_type().is_edge());
        assert_eq!(value.prefix(), b"index.html");
        assert_eq!(
            value.reference().address(),
            ChunkAddress::from_slice(&addr(0xaa)).unwrap()
        );

        let edge = node.fork(b'a').unwrap();
        assert!(edge.node_type().is_edge());
        assert!(edge.node_type().has_metadata());
        assert_eq!(edge.prefix(), b"assets/");
    }

    #[test]
    fn obfuscation_key_is_applied() {
        let mut key = [0u8; OBFUSCATION_KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8 ^ 0x5f;
        }
        let forks = vec![ForkSpec {
            node_type: 2,
            prefix: b"a",
            reference: addr(0x01),
            metadata: None,
        }];
        let bytes = build_node(key, "mantaray:0.1", REFERENCE_SIZE, &addr(0x22), &forks);

        let node = ManifestNode::from_bytes(&bytes).unwrap();
        assert_eq!(node.fork_count(), 1);
        assert_eq!(node.fork(b'a').unwrap().prefix(), b"a");
    }

    #[test]
    fn empty_entry_reads_as_none() {
        let bytes = build_node(
            [0u8; 32],
            "mantaray:0.2",
            REFERENCE_SIZE,
            &[0u8; REFERENCE_SIZE],
            &[],
        );
        let node = ManifestNode::from_bytes(&bytes).unwrap();
        assert!(node.entry().is_none());
        assert_eq!(node.fork_count(), 0);
    }

    #[test]
    fn encrypted_references_are_supported() {
        let mut reference = vec![0x0au8; REFERENCE_SIZE];
        reference.extend(vec![0x0bu8; REFERENCE_SIZE]);
        let forks = vec![ForkSpec {
            node_type: 2,
            prefix: b"f",
            reference: reference.clone(),
            metadata: None,
        }];
        let bytes = build_node(
            [0u8; 32],
            "mantaray:0.2",
            ENC_REFERENCE_SIZE,
            &reference,
            &forks,
        );

        let node = ManifestNode::from_bytes(&bytes).unwrap();
        assert_eq!(node.ref_size(), ENC_REFERENCE_SIZE);
        assert!(node.entry().unwrap().is_encrypted());
        assert!(node.fork(b'f').unwrap().reference().is_encrypted());
    }

    #[test]
    fn rejects_unknown_version() {
        let bytes = build_node(
            [0u8; 32],
            "mantaray:9.9",
            REFERENCE_SIZE,
            &[0u8; REFERENCE_SIZE],
            &[],
        );
        assert_matches!(
            ManifestNode::from_bytes(&bytes),
            Err(ManifestError::UnknownVersion)
        );
    }

    #[test]
    fn rejects_bad_reference_size() {
        let bytes = build_node([0u8; 32], "mantaray:0.2", 16, &[0u8; 16], &[]);
        assert_matches!(
            ManifestNode::from_bytes(&bytes),
            Err(ManifestError::InvalidReferenceSize { size: 16 })
        );
    }

    #[test]
    fn rejects_truncated_node() {
        assert_matches!(
            ManifestNode::from_bytes(&[0u8; 10]),
            Err(ManifestError::Truncated { .. })
        );

        let forks = vec![ForkSpec {
            node_type: 2,
            prefix: b"a",
            reference: addr(0x01),
            metadata: None,
        }];
        let mut bytes = build_node(
            [0u8; 32],
            "mantaray:0.2",
            REFERENCE_SIZE,
            &addr(0x22),
            &forks,
        );
        bytes.truncate(bytes.len() - 8);
        assert_matches!(
            ManifestNode::from_bytes(&bytes),
            Err(ManifestError::TruncatedFork { .. })
        );
    }
}
