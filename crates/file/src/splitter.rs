//! Splitting pipeline: byte stream in, root reference out.
//!
//! Input is cut into 4096-byte leaf frames. Each level buffers child
//! references until the level's fan-out is reached, then closes into an
//! intermediate chunk whose payload is the packed child references (parity
//! references appended when redundancy is on) and whose span is the sum of
//! the data children's spans. At end of input a level holding a single
//! child promotes it unchanged to the level above (a carrier chunk).

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use vertex_file_primitives::constants::{CHUNK_SIZE, SPAN_SIZE};
use vertex_file_primitives::{
    random_key, BmtPool, ChunkAddress, ChunkCipher, ChunkStore, ContentChunk, KeystreamCipher,
    Reference, Stamper,
};
use vertex_file_redundancy::encode_parities;

use crate::config::UploadOptions;
use crate::error::{FileError, Result};

/// Chunking pipeline for uploads.
pub struct Splitter<S, T, C = KeystreamCipher> {
    store: S,
    stamper: T,
    pool: BmtPool,
    options: UploadOptions,
    capacity: usize,
    cipher: C,
}

/// One level's buffered children, awaiting closure into a parent chunk.
#[derive(Default)]
struct Level {
    refs: Vec<Reference>,
    spans: Vec<u64>,
    shards: Vec<Bytes>,
}

impl Level {
    fn push(&mut self, entry: (Reference, u64, Bytes)) {
        self.refs.push(entry.0);
        self.spans.push(entry.1);
        self.shards.push(entry.2);
    }

    fn len(&self) -> usize {
        self.refs.len()
    }

    fn take_single(&mut self) -> (Reference, u64, Bytes) {
        (
            self.refs.remove(0),
            self.spans.remove(0),
            self.shards.remove(0),
        )
    }
}

impl<S: ChunkStore, T: Stamper> Splitter<S, T> {
    /// Create a splitter with the default keystream cipher.
    pub fn new(store: S, stamper: T, pool: BmtPool, options: UploadOptions) -> Self {
        Self::with_cipher(store, stamper, pool, options, KeystreamCipher)
    }
}

impl<S: ChunkStore, T: Stamper, C: ChunkCipher> Splitter<S, T, C> {
    /// Create a splitter with a caller-supplied cipher.
    pub fn with_cipher(
        store: S,
        stamper: T,
        pool: BmtPool,
        options: UploadOptions,
        cipher: C,
    ) -> Self {
        Self {
            capacity: options.effective_capacity(),
            store,
            stamper,
            pool,
            options,
            cipher,
        }
    }

    /// The upload options this splitter was built with.
    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Split a byte stream into a chunk tree, returning the root reference.
    pub async fn split<R: AsyncRead + Unpin + Send>(&self, mut reader: R) -> Result<Reference> {
        let mut levels: Vec<Level> = vec![Level::default()];
        let mut total = 0u64;
        let mut frame = vec![0u8; CHUNK_SIZE];

        loop {
            let len = read_frame(&mut reader, &mut frame).await?;
            if len == 0 {
                break;
            }
            total += len as u64;
            let (reference, stored) = self.write_chunk(len as u64, &frame[..len]).await?;
            self.push(&mut levels, 0, (reference, len as u64, stored))
                .await?;
        }

        if total == 0 {
            let (reference, _) = self.write_chunk(0, &[]).await?;
            debug!(address = %reference.address(), "empty input stored as the empty chunk");
            return Ok(reference);
        }

        let root = self.finish(levels).await?;
        debug!(address = %root.address(), total, "split complete");
        Ok(root)
    }

    /// Split an in-memory buffer.
    pub async fn split_bytes(&self, data: &[u8]) -> Result<Reference> {
        self.split(data).await
    }

    /// Buffer a child at `depth`, closing each level that fills up.
    async fn push(
        &self,
        levels: &mut Vec<Level>,
        depth: usize,
        entry: (Reference, u64, Bytes),
    ) -> Result<()> {
        let mut depth = depth;
        let mut entry = entry;
        loop {
            if levels.len() <= depth {
                levels.push(Level::default());
            }
            levels[depth].push(entry);
            if levels[depth].len() < self.capacity {
                return Ok(());
            }
            entry = self.close_level(levels, depth).await?;
            depth += 1;
        }
    }

    /// Drain remaining partial levels upward until a single root remains.
    async fn finish(&self, mut levels: Vec<Level>) -> Result<Reference> {
        let mut depth = 0;
        loop {
            if depth >= levels.len() {
                return Err(FileError::validation("split produced no root"));
            }
            let is_top = depth == levels.len() - 1;
            match levels[depth].len() {
                0 => depth += 1,
                1 if is_top => return Ok(levels[depth].refs[0]),
                1 => {
                    // Carrier chunk: a lone leftover rides up unmodified.
                    let entry = levels[depth].take_single();
                    trace!(depth, span = entry.1, "promoting carrier chunk");
                    self.push(&mut levels, depth + 1, entry).await?;
                    depth += 1;
                }
                _ => {
                    let entry = self.close_level(&mut levels, depth).await?;
                    self.push(&mut levels, depth + 1, entry).await?;
                    depth += 1;
                }
            }
        }
    }

    /// Close a full (or final partial) level into an intermediate chunk.
    async fn close_level(
        &self,
        levels: &mut [Level],
        depth: usize,
    ) -> Result<(Reference, u64, Bytes)> {
        let level = std::mem::take(&mut levels[depth]);
        let data_count = level.len();

        let parity_count = self
            .options
            .level
            .parities(data_count, self.options.encrypt);
        let mut parity_addresses = Vec::with_capacity(parity_count);
        if parity_count > 0 {
            let parity_shards = encode_parities(&level.shards, parity_count)?;
            for shard in parity_shards {
                // Parity chunks are stored as raw coded bytes, never
                // encrypted, and referenced by plain 32-byte addresses.
                parity_addresses.push(self.persist(shard).await?);
            }
            trace!(depth, data_count, parity_count, "erasure group closed");
        }

        let mut payload = BytesMut::new();
        for reference in &level.refs {
            payload.extend_from_slice(&reference.to_bytes());
        }
        for address in &parity_addresses {
            payload.extend_from_slice(address.as_bytes());
        }

        let span: u64 = level.spans.iter().sum();
        let (reference, stored) = self.write_chunk(span, &payload).await?;
        Ok((reference, span, stored))
    }

    /// Assemble, optionally encrypt, and persist one chunk.
    async fn write_chunk(&self, span: u64, payload: &[u8]) -> Result<(Reference, Bytes)> {
        let mut plain = BytesMut::with_capacity(SPAN_SIZE + payload.len());
        plain.extend_from_slice(&span.to_le_bytes());
        plain.extend_from_slice(payload);
        let plain = plain.freeze();

        if self.options.encrypt {
            let key = random_key();
            let stored = self.cipher.encrypt(&key, &plain);
            let address = self.persist(stored.clone()).await?;
            Ok((Reference::encrypted(address, key), stored))
        } else {
            let address = self.persist(plain.clone()).await?;
            Ok((Reference::plain(address), plain))
        }
    }

    /// Hash, stamp and store one chunk in its final stored form.
    async fn persist(&self, stored: Bytes) -> Result<ChunkAddress> {
        let span = u64::from_le_bytes(
            stored
                .get(..SPAN_SIZE)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| FileError::validation("stored chunk shorter than a span"))?,
        );
        let address = self
            .pool
            .chunk_address(span, stored.slice(SPAN_SIZE..))
            .await?;

        let stamp = self.stamper.stamp(&address)?;
        trace!(address = %address, bucket = stamp.bucket_index(), "chunk stamped");

        let chunk = ContentChunk::with_address(stored, address)?;
        self.store.add(chunk.into()).await?;
        Ok(address)
    }
}

/// Read up to one full frame, returning the bytes read (0 at end of input).
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
