//! Mantaray manifest deserialization.
//!
//! Manifests map paths to references through a compacted trie of nodes,
//! each node stored as an ordinary content chunk. This crate models the
//! read shape only, enough for collection traversal to discover every
//! referenced chunk.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod error;
mod node;

pub use error::{ManifestError, Result};
pub use node::{Fork, ManifestNode, NodeType, FORK_PREFIX_MAX, OBFUSCATION_KEY_SIZE};
