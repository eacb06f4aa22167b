//! Frame cache for extracted viewport regions.
//!
//! This module provides an LRU cache of extracted frames so that repeated
//! renders of an unchanged viewport skip storage reads and decoding.
//!
//! # Cache Key
//!
//! Frames are cached by a composite key including:
//! - Source identity (canonical locator)
//! - Pyramid level
//! - Region X/Y offset
//! - Region width/height
//!
//! # Invalidation
//!
//! Keys only carry the locator as source identity, so a different image
//! opened at the same path would collide. The cache must be cleared whenever
//! the active source changes.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;

use super::frame::Frame;

/// Default cache capacity: 100 frames
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 100;

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for extracted frames.
///
/// Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Source identity
    pub source_id: Arc<str>,

    /// Pyramid level (0 = highest resolution)
    pub level: usize,

    /// Left edge in level pixels (negative when letterboxed)
    pub x: i64,

    /// Top edge in level pixels (negative when letterboxed)
    pub y: i64,

    pub width: usize,

    pub height: usize,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(
        source_id: impl Into<Arc<str>>,
        level: usize,
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            level,
            x,
            y,
            width,
            height,
        }
    }
}

// =============================================================================
// Tile Cache
// =============================================================================

/// Strict LRU cache of extracted frames with an entry-count capacity.
///
/// # Thread Safety
///
/// All operations lock an internal mutex, so the cache can be shared with
/// background readers via `Arc`. Cache operations never fail.
///
/// # Example
///
/// ```
/// use pyramid_view::tile::{CacheKey, Frame, TileCache};
///
/// let cache = TileCache::new();
/// let key = CacheKey::new("/data/slide.zarr", 0, 0, 0, 800, 600);
///
/// cache.put(key.clone(), Frame::blank(600, 800));
/// assert!(cache.get(&key).is_some());
/// ```
pub struct TileCache {
    cache: Mutex<LruCache<CacheKey, Frame>>,
}

impl TileCache {
    /// Create a new tile cache with default capacity (100 frames).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a new tile cache holding at most `capacity` frames (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Frame>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get a frame from the cache.
    ///
    /// A hit marks the entry as most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Frame> {
        self.lock().get(key).cloned()
    }

    /// Check if a frame is cached without updating LRU order.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    /// Store a frame.
    ///
    /// An existing key is updated and promoted; at capacity the least
    /// recently used entry is evicted first.
    pub fn put(&self, key: CacheKey, frame: Frame) {
        self.lock().put(key, frame);
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Get the current number of cached frames.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Get the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
