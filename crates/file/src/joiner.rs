//! Joining pipeline: root reference in, byte stream out.
//!
//! The tree is walked depth first, left to right. Each intermediate
//! chunk's children resolve through a [`ParityDecoder`] under the
//! configured strategy, so missing chunks are recovered transparently
//! where the parity budget allows. Output is produced lazily; a chunk
//! that cannot be resolved fails the stream at the point it is reached.

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vertex_file_primitives::constants::CHUNK_SIZE;
use vertex_file_primitives::{ChunkCipher, ChunkStore, KeystreamCipher, Reference};

use crate::config::DownloadOptions;
use crate::decoder::ParityDecoder;
use crate::error::{FileError, Result};
use crate::tree::{self, PlainChunk};

/// Lazy byte stream over a chunk tree, one leaf payload per item.
pub type ChunkDataStream = BoxStream<'static, Result<Bytes>>;

/// Chunk tree reader.
#[derive(Clone)]
pub struct Joiner<S, C = KeystreamCipher> {
    store: S,
    options: DownloadOptions,
    token: CancellationToken,
    cipher: C,
}

impl<S, C> Joiner<S, C>
where
    S: ChunkStore + Clone + Send + Sync + 'static,
    C: ChunkCipher + Clone + 'static,
{
    /// Create a joiner with a caller-supplied cipher.
    pub fn with_cipher(store: S, options: DownloadOptions, cipher: C) -> Self {
        Self {
            store,
            options,
            token: CancellationToken::new(),
            cipher,
        }
    }

    /// Tie the joiner's lifetime to a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// The download options this joiner was built with.
    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Stream the tree's content as a sequence of leaf payloads.
    ///
    /// The root is fetched on first poll; failures surface where they
    /// occur, after any bytes already streamed.
    pub fn stream(&self, root: Reference) -> ChunkDataStream {
        struct State<S, C> {
            joiner: Joiner<S, C>,
            root: Option<Reference>,
            encrypted: bool,
            stack: Vec<PlainChunk>,
        }

        let state = State {
            joiner: self.clone(),
            encrypted: root.is_encrypted(),
            root: Some(root),
            stack: Vec::new(),
        };

        Box::pin(futures::stream::try_unfold(state, |mut state| async move {
            if let Some(root) = state.root.take() {
                let node = state.joiner.load_root(&root).await?;
                state.stack.push(node);
            }
            loop {
                let Some(node) = state.stack.pop() else {
                    return Ok(None);
                };
                if node.span <= CHUNK_SIZE as u64 {
                    return Ok(Some((node.payload, state)));
                }
                let children = state.joiner.expand(&node, state.encrypted).await?;
                state.stack.extend(children.into_iter().rev());
            }
        }))
    }

    /// Read the whole tree into memory.
    pub async fn join(&self, root: &Reference) -> Result<Bytes> {
        let mut pieces = self.stream(*root);
        let mut out = BytesMut::new();
        while let Some(piece) = pieces.try_next().await? {
            out.extend_from_slice(&piece);
        }
        debug!(address = %root.address(), len = out.len(), "join complete");
        Ok(out.freeze())
    }

    /// Fetch and decode the root chunk directly, outside any group.
    async fn load_root(&self, reference: &Reference) -> Result<PlainChunk> {
        let address = reference.address();
        let chunk = self
            .store
            .try_get(&address, &self.token)
            .await?
            .ok_or(FileError::NotFound { address })?;
        tree::decode_chunk(&self.cipher, chunk.data().clone(), reference)
    }

    /// Resolve an intermediate node's children into plaintext nodes.
    async fn expand(&self, node: &PlainChunk, encrypted: bool) -> Result<Vec<PlainChunk>> {
        let capacity = self.options.effective_capacity(encrypted);
        let group = tree::parse_group(
            node.span,
            &node.payload,
            capacity,
            encrypted,
            self.options.level,
        )?;

        let mut decoder = ParityDecoder::new(
            group.shard_references(),
            self.store.clone(),
            self.options.level,
            encrypted,
            self.token.clone(),
        )?;
        decoder
            .try_fetch(self.options.strategy, self.options.fallback)
            .await?;

        let mut children = Vec::with_capacity(group.data.len());
        for (reference, child_span) in &group.data {
            let chunk = decoder.get_chunk(&reference.address())?;
            let child = tree::decode_chunk(&self.cipher, chunk.data().clone(), reference)?;
            if child.span != *child_span {
                return Err(FileError::validation(format!(
                    "child span {} disagrees with parent-derived span {child_span}",
                    child.span,
                )));
            }
            children.push(child);
        }
        Ok(children)
    }
}

impl<S> Joiner<S>
where
    S: ChunkStore + Clone + Send + Sync + 'static,
{
    /// Create a joiner with the default keystream cipher.
    pub fn new(store: S, options: DownloadOptions) -> Self {
        Self::with_cipher(store, options, KeystreamCipher)
    }
}
