//! Binary Merkle Tree (BMT) chunk addressing.
//!
//! A chunk's address is `keccak256(span ‖ root)` where `root` is the BMT
//! root over the chunk payload zero-padded to 128 segments of 32 bytes.

mod error;
mod hasher;
mod pool;

pub use error::{BmtError, Result};
pub use hasher::{chunk_address, BmtHasher};
pub use pool::BmtPool;
