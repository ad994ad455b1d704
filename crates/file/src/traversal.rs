//! Chunk-graph traversal.
//!
//! A traverser walks every chunk reachable from a root reference, data
//! trees and manifest tries alike, reporting each member through a
//! [`TraversalObserver`] instead of failing fast. Missing chunks get one
//! `on_not_found` call and no descent; chunks whose content does not hash
//! to their address get one `on_invalid` call and no descent. Parity
//! references are audited as leaves.

use async_recursion::async_recursion;
use bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use vertex_file_primitives::constants::CHUNK_SIZE;
use vertex_file_primitives::{ChunkAddress, ChunkCipher, ChunkStore, KeystreamCipher, Reference};
use vertex_manifest::ManifestNode;

use crate::config::DownloadOptions;
use crate::decoder::ParityDecoder;
use crate::error::{FileError, Result};
use crate::tree;

/// Callbacks reporting every reference a traversal reaches.
///
/// Observers run inline with the walk; use interior mutability to collect
/// results.
pub trait TraversalObserver: Send + Sync {
    /// A chunk was resolved and verified. `parent` is `None` for roots.
    fn on_found(&self, parent: Option<ChunkAddress>, reference: &Reference);

    /// A chunk was resolved but its content does not match its address.
    fn on_invalid(&self, parent: Option<ChunkAddress>, reference: &Reference);

    /// A chunk could not be resolved, even through recovery.
    fn on_not_found(&self, reference: &Reference);
}

/// Walks chunk trees and manifest tries, auditing every reference.
pub struct ChunkTraverser<S, C = KeystreamCipher> {
    store: S,
    options: DownloadOptions,
    token: CancellationToken,
    cipher: C,
}

impl<S> ChunkTraverser<S>
where
    S: ChunkStore + Clone + Send + Sync,
{
    /// Create a traverser with the default keystream cipher.
    pub fn new(store: S, options: DownloadOptions) -> Self {
        Self::with_cipher(store, options, KeystreamCipher)
    }
}

impl<S, C> ChunkTraverser<S, C>
where
    S: ChunkStore + Clone + Send + Sync,
    C: ChunkCipher,
{
    /// Create a traverser with a caller-supplied cipher.
    pub fn with_cipher(store: S, options: DownloadOptions, cipher: C) -> Self {
        Self {
            store,
            options,
            token: CancellationToken::new(),
            cipher,
        }
    }

    /// Tie the traverser's lifetime to a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Traverse the data tree under `root`, depth first, left to right.
    pub async fn traverse_data(
        &self,
        root: &Reference,
        observer: &dyn TraversalObserver,
    ) -> Result<()> {
        self.visit_root(root, observer, false).await?;
        Ok(())
    }

    /// Traverse a manifest trie and every data tree it references.
    ///
    /// Fails with a validation error when the root does not carry the
    /// manifest version marker.
    pub async fn traverse_manifest(
        &self,
        root: &Reference,
        observer: &dyn TraversalObserver,
    ) -> Result<()> {
        debug!(address = %root.address(), "traversing manifest");
        let Some(bytes) = self.visit_root(root, observer, true).await? else {
            return Ok(());
        };
        let node = ManifestNode::from_bytes(&bytes)
            .map_err(|_| FileError::validation("root chunk is not a manifest node"))?;
        self.walk_node(&node, observer).await
    }

    /// Traverse the manifest node at `reference` and everything below it.
    #[async_recursion]
    pub async fn traverse_manifest_node(
        &self,
        reference: &Reference,
        observer: &dyn TraversalObserver,
    ) -> Result<()> {
        let Some(bytes) = self.visit_root(reference, observer, true).await? else {
            trace!(address = %reference.address(), "manifest node unreachable, skipping descent");
            return Ok(());
        };
        let node = ManifestNode::from_bytes(&bytes)?;
        self.walk_node(&node, observer).await
    }

    /// Recurse into a parsed manifest node's entry and forks.
    async fn walk_node(
        &self,
        node: &ManifestNode,
        observer: &dyn TraversalObserver,
    ) -> Result<()> {
        if let Some(entry) = node.entry() {
            self.traverse_data(entry, observer).await?;
        }
        for fork in node.forks() {
            if fork.node_type().is_edge() {
                self.traverse_manifest_node(fork.reference(), observer).await?;
            } else {
                self.traverse_data(fork.reference(), observer).await?;
            }
        }
        Ok(())
    }

    /// Resolve, verify and walk one tree root.
    ///
    /// Returns the joined content when `collect` is set and the whole tree
    /// resolved, `None` when the root (or, while collecting, any part) was
    /// unreachable or invalid.
    async fn visit_root(
        &self,
        reference: &Reference,
        observer: &dyn TraversalObserver,
        collect: bool,
    ) -> Result<Option<Bytes>> {
        let address = reference.address();
        let Some(chunk) = self.store.try_get(&address, &self.token).await? else {
            observer.on_not_found(reference);
            return Ok(None);
        };
        if chunk.verify(&address).is_err() {
            observer.on_invalid(None, reference);
            return Ok(None);
        }
        observer.on_found(None, reference);

        let node = tree::decode_chunk(&self.cipher, chunk.data().clone(), reference)?;
        if node.span <= CHUNK_SIZE as u64 {
            return Ok(Some(node.payload));
        }

        let encrypted = reference.is_encrypted();
        let (complete, out) = self
            .descend(address, node.span, &node.payload, encrypted, collect, observer)
            .await?;
        Ok((complete || !collect).then(|| out.freeze()))
    }

    /// Walk one intermediate chunk's sibling group.
    ///
    /// Returns whether every data member below resolved, and the collected
    /// bytes when collecting.
    #[async_recursion]
    async fn descend(
        &self,
        parent: ChunkAddress,
        span: u64,
        payload: &[u8],
        encrypted: bool,
        collect: bool,
        observer: &dyn TraversalObserver,
    ) -> Result<(bool, BytesMut)> {
        let capacity = self.options.effective_capacity(encrypted);
        let group = tree::parse_group(span, payload, capacity, encrypted, self.options.level)?;

        let mut decoder = ParityDecoder::new(
            group.shard_references(),
            self.store.clone(),
            self.options.level,
            encrypted,
            self.token.clone(),
        )?;
        // An audit touches every member, parity included, so the decoder
        // fetches the full group regardless of the read strategy.
        match decoder.try_fetch_and_recover().await {
            Ok(()) | Err(FileError::InsufficientShards { .. }) => {}
            Err(err) => return Err(err),
        }

        let mut out = BytesMut::new();
        let mut complete = true;
        for (reference, _) in &group.data {
            let address = reference.address();
            let Ok(chunk) = decoder.get_chunk(&address) else {
                observer.on_not_found(reference);
                complete = false;
                continue;
            };
            if chunk.verify(&address).is_err() {
                observer.on_invalid(Some(parent), reference);
                complete = false;
                continue;
            }
            observer.on_found(Some(parent), reference);

            let child = tree::decode_chunk(&self.cipher, chunk.data().clone(), reference)?;
            if child.span <= CHUNK_SIZE as u64 {
                if collect {
                    out.extend_from_slice(&child.payload);
                }
                continue;
            }
            let (child_complete, child_out) = self
                .descend(address, child.span, &child.payload, encrypted, collect, observer)
                .await?;
            complete &= child_complete;
            if collect {
                out.extend_from_slice(&child_out);
            }
        }

        for reference in &group.parity {
            let address = reference.address();
            match decoder.get_chunk(&address) {
                Err(_) => observer.on_not_found(reference),
                Ok(chunk) => {
                    if chunk.verify(&address).is_err() {
                        observer.on_invalid(Some(parent), reference);
                    } else {
                        observer.on_found(Some(parent), reference);
                    }
                }
            }
        }

        Ok((complete, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    use alloy_primitives::keccak256;
    use vertex_file_primitives::constants::REFERENCE_SIZE;
    use vertex_file_primitives::{
        chunk_address, BmtPool, ContentChunk, MemoryChunkStore, NoopStamper,
    };
    use vertex_file_redundancy::RedundancyLevel;

    use crate::config::UploadOptions;
    use crate::splitter::Splitter;

    #[derive(Default)]
    struct Recorder {
        found: Mutex<Vec<ChunkAddress>>,
        invalid: Mutex<Vec<ChunkAddress>>,
        not_found: Mutex<Vec<ChunkAddress>>,
    }

    impl TraversalObserver for Recorder {
        fn on_found(&self, _parent: Option<ChunkAddress>, reference: &Reference) {
            self.found.lock().unwrap().push(reference.address());
        }
        fn on_invalid(&self, _parent: Option<ChunkAddress>, reference: &Reference) {
            self.invalid.lock().unwrap().push(reference.address());
        }
        fn on_not_found(&self, reference: &Reference) {
            self.not_found.lock().unwrap().push(reference.address());
        }
    }

    async fn upload(
        store: &Arc<MemoryChunkStore>,
        data: &[u8],
        options: UploadOptions,
    ) -> Reference {
        Splitter::new(
            store.clone(),
            NoopStamper::default(),
            BmtPool::new(4),
            options,
        )
        .split_bytes(data)
        .await
        .unwrap()
    }

    fn traverser(
        store: Arc<MemoryChunkStore>,
        options: DownloadOptions,
    ) -> ChunkTraverser<Arc<MemoryChunkStore>> {
        ChunkTraverser::new(store, options)
    }

    #[tokio::test]
    async fn visits_every_chunk_once() {
        let store = Arc::new(MemoryChunkStore::new());
        let options = UploadOptions::new().with_compact_level(126);
        let data: Vec<u8> = (0..5 * CHUNK_SIZE).map(|i| (i % 251) as u8).collect();
        let root = upload(&store, &data, options).await;

        let recorder = Recorder::default();
        traverser(store.clone(), DownloadOptions::new().with_compact_level(126))
            .traverse_data(&root, &recorder)
            .await
            .unwrap();

        let mut found = recorder.found.lock().unwrap().clone();
        found.sort();
        found.dedup();
        assert_eq!(found.len(), store.len());
        assert!(recorder.invalid.lock().unwrap().is_empty());
        assert!(recorder.not_found.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parity_chunks_are_audited() {
        let store = Arc::new(MemoryChunkStore::new());
        let frames = 6;
        let data = vec![5u8; frames * CHUNK_SIZE];
        let options = UploadOptions::new().with_level(RedundancyLevel::Medium);
        let root = upload(&store, &data, options).await;

        let recorder = Recorder::default();
        let download = DownloadOptions::new().with_level(RedundancyLevel::Medium);
        traverser(store.clone(), download)
            .traverse_data(&root, &recorder)
            .await
            .unwrap();

        // Every stored chunk reported found: leaves, parities and root.
        assert_eq!(recorder.found.lock().unwrap().len(), store.len());
    }

    #[tokio::test]
    async fn deleted_leaf_reported_once() {
        let store = Arc::new(MemoryChunkStore::new());
        let options = UploadOptions::new().with_compact_level(126);
        let data: Vec<u8> = (0..4 * CHUNK_SIZE).map(|i| (i % 249) as u8).collect();
        let root = upload(&store, &data, options).await;

        let victim = chunk_address(CHUNK_SIZE as u64, &data[CHUNK_SIZE..2 * CHUNK_SIZE]).unwrap();
        assert!(store.remove(&victim).await.unwrap());

        let recorder = Recorder::default();
        traverser(store.clone(), DownloadOptions::new().with_compact_level(126))
            .traverse_data(&root, &recorder)
            .await
            .unwrap();

        assert_eq!(recorder.not_found.lock().unwrap().as_slice(), &[victim]);
        assert_eq!(recorder.found.lock().unwrap().len(), store.len());
    }

    #[tokio::test]
    async fn tampered_chunk_reported_invalid() {
        let store = Arc::new(MemoryChunkStore::new());
        let options = UploadOptions::new().with_compact_level(126);
        let data: Vec<u8> = (0..3 * CHUNK_SIZE).map(|i| (i % 247) as u8).collect();
        let root = upload(&store, &data, options).await;

        // Replace a leaf with different content claiming the same address.
        let victim = chunk_address(CHUNK_SIZE as u64, &data[..CHUNK_SIZE]).unwrap();
        store.remove(&victim).await.unwrap();
        let mut forged = (CHUNK_SIZE as u64).to_le_bytes().to_vec();
        forged.extend(vec![0xddu8; CHUNK_SIZE]);
        let forged = ContentChunk::with_address(forged, victim).unwrap();
        store.add(forged.into()).await.unwrap();

        let recorder = Recorder::default();
        traverser(store, DownloadOptions::new().with_compact_level(126))
            .traverse_data(&root, &recorder)
            .await
            .unwrap();

        assert_eq!(recorder.invalid.lock().unwrap().as_slice(), &[victim]);
    }

    /// Minimal mantaray node: zero obfuscation key, version 0.2, a 32-byte
    /// entry and one fork per requested child.
    fn manifest_node_bytes(entry: Option<&Reference>, forks: &[(u8, &Reference, bool)]) -> Vec<u8> {
        let mut out = vec![0u8; 32];
        out.extend_from_slice(&keccak256(b"mantaray:0.2")[..31]);
        out.push(REFERENCE_SIZE as u8);
        match entry {
            Some(reference) => out.extend_from_slice(&reference.to_bytes()),
            None => out.extend_from_slice(&[0u8; REFERENCE_SIZE]),
        }

        let mut bitmap = [0u8; 32];
        for (first, _, _) in forks {
            bitmap[usize::from(*first) / 8] |= 1u8 << (first % 8);
        }
        out.extend_from_slice(&bitmap);

        for (first, reference, edge) in forks {
            out.push(if *edge { 4 } else { 2 });
            out.push(1);
            let mut prefix = [0u8; 30];
            prefix[0] = *first;
            out.extend_from_slice(&prefix);
            out.extend_from_slice(&reference.to_bytes());
        }
        out
    }

    #[tokio::test]
    async fn manifest_traversal_reaches_all_files() {
        let store = Arc::new(MemoryChunkStore::new());
        let file_a = upload(&store, b"file a content", UploadOptions::new()).await;
        let file_b = upload(&store, &vec![9u8; CHUNK_SIZE + 50], UploadOptions::new()).await;

        let leaf_node = manifest_node_bytes(None, &[(b'b', &file_b, false)]);
        let leaf_ref = upload(&store, &leaf_node, UploadOptions::new()).await;

        let root_node = manifest_node_bytes(Some(&file_a), &[(b'a', &leaf_ref, true)]);
        let root_ref = upload(&store, &root_node, UploadOptions::new()).await;

        let recorder = Recorder::default();
        traverser(store.clone(), DownloadOptions::new())
            .traverse_manifest(&root_ref, &recorder)
            .await
            .unwrap();

        let mut found = recorder.found.lock().unwrap().clone();
        found.sort();
        found.dedup();
        assert_eq!(found.len(), store.len());
        assert!(recorder.not_found.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_manifest_root_is_rejected() {
        let store = Arc::new(MemoryChunkStore::new());
        let root = upload(&store, b"just a file", UploadOptions::new()).await;

        let recorder = Recorder::default();
        let err = traverser(store, DownloadOptions::new())
            .traverse_manifest(&root, &recorder)
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::Validation { .. }));
    }
}
