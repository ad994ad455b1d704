//! File engine over content-addressed chunks.
//!
//! This crate turns byte streams into erasure-protected chunk trees and
//! back: the [`Splitter`] chunks and stores uploads, the [`Joiner`] streams
//! them out with transparent Reed-Solomon recovery, and the
//! [`ChunkTraverser`] audits every chunk reachable from a root reference,
//! manifests included.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod decoder;
mod error;
mod joiner;
mod splitter;
mod traversal;
mod tree;

pub use config::{effective_capacity, DownloadOptions, UploadOptions};
pub use decoder::ParityDecoder;
pub use error::{FileError, Result};
pub use joiner::{ChunkDataStream, Joiner};
pub use splitter::Splitter;
pub use traversal::{ChunkTraverser, TraversalObserver};
