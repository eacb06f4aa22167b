//! Byte-level I/O for archive-backed containers.
//!
//! Directory containers read whole files per key; ZIP containers go through
//! a [`RangeReader`] so only the central directory and the requested entries
//! are ever read.

mod block_cache;
mod file_reader;
mod range_reader;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};
pub use file_reader::FileRangeReader;
pub use range_reader::{read_u16_le, read_u32_le, read_u64_le, RangeReader};
