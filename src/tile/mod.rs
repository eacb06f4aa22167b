//! Frame extraction and caching.
//!
//! This module turns rectangles of a pyramid level into display frames and
//! keeps recently produced frames around.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             FrameComposer               │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileCache   │  │ RegionExtractor │  │
//! │  │  (frames,    │  │ (axes → HWC,    │  │
//! │  │   LRU)       │  │  u8 rescale)    │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             PyramidSource               │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Frame`]: dense HWC 8-bit pixel buffer with 1, 3 or 4 channels
//! - [`RegionExtractor`]: reads a rectangle and converts it to a [`Frame`]
//! - [`TileCache`]: strict LRU cache of frames
//! - [`CacheKey`]: composite key (source, level, rectangle)

mod cache;
mod extractor;
mod frame;

pub use cache::{CacheKey, TileCache, DEFAULT_TILE_CACHE_CAPACITY};
pub use extractor::RegionExtractor;
pub use frame::Frame;
