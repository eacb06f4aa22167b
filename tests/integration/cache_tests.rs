//! Frame cache tests.
//!
//! Tests verify:
//! - The cache behaves as a strict LRU with an entry-count capacity
//! - Repeated renders of the same view are served from the cache
//! - Loading another image leaves no stale frames behind

use std::collections::VecDeque;

use proptest::prelude::*;

use pyramid_view::session::{Session, SessionConfig};
use pyramid_view::tile::{CacheKey, Frame, TileCache};

use super::test_utils::write_gray_pyramid;

fn key(n: u8) -> CacheKey {
    CacheKey::new("mem://image", 0, n as i64 * 100, 0, 4, 4)
}

proptest! {
    #[test]
    fn prop_cache_matches_lru_model(
        capacity in 1usize..8,
        ops in proptest::collection::vec((any::<bool>(), 0u8..12), 1..80),
    ) {
        let cache = TileCache::with_capacity(capacity);
        let mut model: VecDeque<u8> = VecDeque::new();

        for (is_put, n) in ops {
            if is_put {
                cache.put(key(n), Frame::blank(4, 4));
                model.retain(|&m| m != n);
                model.push_back(n);
                if model.len() > capacity {
                    model.pop_front();
                }
            } else {
                let hit = cache.get(&key(n)).is_some();
                prop_assert_eq!(hit, model.contains(&n));
                if hit {
                    model.retain(|&m| m != n);
                    model.push_back(n);
                }
            }
            prop_assert!(cache.len() <= capacity);
            prop_assert_eq!(cache.len(), model.len());
        }

        for n in 0u8..12 {
            prop_assert_eq!(cache.contains(&key(n)), model.contains(&n));
        }
    }
}

#[test]
fn test_repeated_render_hits_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(400, 400), (200, 200)], 64);

    let mut session = Session::new(SessionConfig {
        canvas_width: 100,
        canvas_height: 100,
        ..Default::default()
    });
    session.load(dir.path()).unwrap();

    let first = session.render().unwrap();
    assert_eq!(session.cache().len(), 1);

    let second = session.render().unwrap();
    assert_eq!(session.cache().len(), 1);
    assert_eq!(first, second);

    session.pan(30.0, 0.0);
    session.render().unwrap();
    assert_eq!(session.cache().len(), 2);
}

#[test]
fn test_cache_capacity_bounds_session() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(400, 400)], 64);

    let mut session = Session::new(SessionConfig {
        cache_capacity: 2,
        canvas_width: 50,
        canvas_height: 50,
        ..Default::default()
    });
    session.load(dir.path()).unwrap();

    for _ in 0..5 {
        session.pan(20.0, 20.0);
        session.render().unwrap();
    }
    assert_eq!(session.cache().len(), 2);
}

#[test]
fn test_load_clears_cache() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first");
    let second = dir.path().join("second");
    write_gray_pyramid(&first, &[(300, 300)], 64);
    write_gray_pyramid(&second, &[(300, 300)], 64);

    let mut session = Session::new(SessionConfig {
        canvas_width: 100,
        canvas_height: 100,
        ..Default::default()
    });
    session.load(&first).unwrap();
    session.render().unwrap();
    assert_eq!(session.cache().len(), 1);

    session.load(&second).unwrap();
    assert!(session.cache().is_empty());

    // A failed load also drops cached frames
    session.render().unwrap();
    assert!(session.load(dir.path().join("missing")).is_err());
    assert!(session.cache().is_empty());
    assert!(session.is_loaded());
}

#[test]
fn test_repeated_get_is_identical() {
    let cache = TileCache::new();
    let frame = Frame::new(2, 2, 3, (0u8..12).collect::<Vec<u8>>()).unwrap();
    cache.put(key(1), frame.clone());

    let a = cache.get(&key(1)).unwrap();
    let b = cache.get(&key(1)).unwrap();
    assert_eq!(a.data(), b.data());
    assert_eq!(a, frame);
}
