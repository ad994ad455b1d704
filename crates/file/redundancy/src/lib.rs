//! Redundancy policy for erasure-coded chunk trees.
//!
//! Uploads choose a [`RedundancyLevel`] trading storage overhead for loss
//! tolerance; each level maps shard counts to parity counts through an
//! [`ErasureTable`]. Downloads choose a [`RedundancyStrategy`] deciding how
//! aggressively shard groups are fetched, independently of the level used
//! at encode time.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod coder;
mod error;
mod level;
mod table;

pub use coder::{encode_parities, reconstruct_data};
pub use error::{RedundancyError, Result};
pub use level::{RedundancyLevel, RedundancyStrategy};
pub use table::ErasureTable;
