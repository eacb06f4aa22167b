//! Pyramid source integration tests.
//!
//! Tests verify:
//! - Level discovery from multiscales, numbered probing and root arrays
//! - Level shapes for every supported axis layout
//! - Region reads: in-bounds, partially outside, entirely outside
//! - Zarr v3 documents and compressed chunks
//! - Rejection of unsupported or inconsistent pyramids

use std::fs;

use serde_json::json;

use pyramid_view::error::{LayoutError, SourceError};
use pyramid_view::format::{ContainerKind, DataType};
use pyramid_view::pyramid::{AxisLayout, PyramidSource};

use super::test_utils::{
    multiscales, pattern, rgb_pattern, write_array_v2, write_array_v3, write_gray_pyramid,
    write_group_v2, write_group_v3, ArraySpec, Codec, Dtype,
};

// =============================================================================
// Level Discovery
// =============================================================================

#[test]
fn test_open_multiscale_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(300, 400), (150, 200), (75, 100)], 64);

    let source = PyramidSource::open(dir.path()).unwrap();

    assert_eq!(source.level_count(), 3);
    assert_eq!(source.container_kind(), ContainerKind::Directory);
    assert_eq!(source.dtype(), DataType::UInt8);
    assert_eq!(source.level_shape(0).unwrap(), (300, 400));
    assert_eq!(source.level_shape(1).unwrap(), (150, 200));
    assert_eq!(source.level_shape(2).unwrap(), (75, 100));
    assert!(source.levels().iter().all(|l| l.layout == AxisLayout::Planar2D));
}

#[test]
fn test_level_shape_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(64, 64)], 32);
    let source = PyramidSource::open(dir.path()).unwrap();

    let err = source.level_shape(1).unwrap_err();
    assert!(matches!(err, SourceError::InvalidLevel { level: 1, count: 1 }));
}

#[test]
fn test_multiscale_paths_are_followed() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), multiscales(&["full", "half"]));
    write_array_v2(dir.path(), "full", &ArraySpec::new(&[40, 60], &[16, 16]), |_| 1.0);
    write_array_v2(dir.path(), "half", &ArraySpec::new(&[20, 30], &[16, 16]), |_| 2.0);

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.level_count(), 2);
    assert_eq!(source.levels()[0].path, "full");
    assert_eq!(source.levels()[1].path, "half");
}

#[test]
fn test_numbered_levels_are_found_without_multiscales() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    write_array_v2(dir.path(), "0", &ArraySpec::new(&[40, 60], &[16, 16]), |_| 1.0);
    write_array_v2(dir.path(), "1", &ArraySpec::new(&[20, 30], &[16, 16]), |_| 1.0);
    // A gap stops the scan
    write_array_v2(dir.path(), "3", &ArraySpec::new(&[5, 7], &[16, 16]), |_| 1.0);

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.level_count(), 2);
}

#[test]
fn test_root_array_is_single_level() {
    let dir = tempfile::tempdir().unwrap();
    write_array_v2(dir.path(), "", &ArraySpec::new(&[30, 50], &[16, 16]), |i| {
        pattern(i[0], i[1]) as f64
    });

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.level_count(), 1);
    assert_eq!(source.level_shape(0).unwrap(), (30, 50));
}

#[test]
fn test_empty_directory_has_no_levels() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));

    assert!(matches!(
        PyramidSource::open(dir.path()),
        Err(SourceError::NoLevels(_))
    ));
}

#[test]
fn test_missing_locator() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        PyramidSource::open(dir.path().join("absent.zarr")),
        Err(SourceError::NotAContainer { .. })
    ));
}

#[test]
fn test_plain_file_is_not_a_container() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.png");
    fs::write(&path, b"\x89PNG\r\n\x1a\nnot a zip").unwrap();

    assert!(matches!(
        PyramidSource::open(&path),
        Err(SourceError::NotAContainer { .. })
    ));
}

#[test]
fn test_increasing_levels_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(50, 50), (100, 100)], 32);

    assert!(matches!(
        PyramidSource::open(dir.path()),
        Err(SourceError::InvalidMetadata { .. })
    ));
}

#[test]
fn test_listed_level_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), multiscales(&["0", "1"]));
    write_array_v2(dir.path(), "0", &ArraySpec::new(&[40, 40], &[16, 16]), |_| 0.0);

    assert!(matches!(
        PyramidSource::open(dir.path()),
        Err(SourceError::InvalidMetadata { .. })
    ));
}

#[test]
fn test_unsupported_rank() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    write_array_v2(dir.path(), "0", &ArraySpec::new(&[10], &[10]), |_| 0.0);

    let err = PyramidSource::open(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        SourceError::Layout(LayoutError::UnsupportedRank { rank: 1, .. })
    ));
}

#[test]
fn test_unsupported_codec() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    fs::create_dir_all(dir.path().join("0")).unwrap();
    fs::write(
        dir.path().join("0/.zarray"),
        br#"{"zarr_format": 2, "shape": [10, 10], "chunks": [5, 5], "dtype": "|u1",
             "compressor": {"id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1, "blocksize": 0},
             "fill_value": 0, "order": "C", "filters": null}"#,
    )
    .unwrap();

    assert!(matches!(
        PyramidSource::open(dir.path()),
        Err(SourceError::UnsupportedCodec { .. })
    ));
}

#[test]
fn test_summary() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sample.zarr");
    write_gray_pyramid(&root, &[(300, 400), (150, 200)], 64);

    let source = PyramidSource::open(&root).unwrap();
    assert_eq!(source.summary(), "sample.zarr | 400×300 | uint8 | 2 levels");
}

// =============================================================================
// Axis Layouts
// =============================================================================

#[test]
fn test_channel_first_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    write_array_v2(dir.path(), "0", &ArraySpec::new(&[3, 20, 30], &[1, 16, 16]), |i| {
        rgb_pattern(i[0], i[1], i[2]) as f64
    });

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.levels()[0].layout, AxisLayout::ChannelFirst3D);
    assert_eq!(source.level_shape(0).unwrap(), (20, 30));

    let region = source.read_region(0, 2, 3, 4, 5).unwrap();
    assert_eq!(region.dims, vec![3, 4, 5]);
    assert_eq!(region.sample(1, 2, 2), rgb_pattern(2, 3, 5) as f64);
}

#[test]
fn test_channel_last_layout() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    write_array_v2(dir.path(), "0", &ArraySpec::new(&[20, 30, 3], &[8, 8, 3]), |i| {
        rgb_pattern(i[2], i[0], i[1]) as f64
    });

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.levels()[0].layout, AxisLayout::ChannelLast3D);
    assert_eq!(source.level_shape(0).unwrap(), (20, 30));

    let region = source.read_region(0, 10, 12, 6, 7).unwrap();
    assert_eq!(region.dims, vec![6, 7, 3]);
    assert_eq!(region.sample(5, 6, 1), rgb_pattern(1, 15, 18) as f64);
}

#[test]
fn test_five_dimensional_layout_reads_first_time_and_plane() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    write_array_v2(
        dir.path(),
        "0",
        &ArraySpec::new(&[2, 3, 2, 16, 16], &[1, 1, 1, 16, 16]),
        // Only t=0, z=0 carries the pattern
        |i| {
            if i[0] == 0 && i[2] == 0 {
                rgb_pattern(i[1], i[3], i[4]) as f64
            } else {
                255.0
            }
        },
    );

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.levels()[0].layout, AxisLayout::TimeChannel5D);
    assert_eq!(source.level_shape(0).unwrap(), (16, 16));
    assert_eq!(source.levels()[0].channels(), 3);

    let region = source.read_region(0, 0, 0, 16, 16).unwrap();
    assert_eq!(region.dims, vec![3, 16, 16]);
    for c in 0..3 {
        assert_eq!(region.sample(7, 9, c), rgb_pattern(c as u64, 7, 9) as f64);
    }
}

// =============================================================================
// Region Reads
// =============================================================================

#[test]
fn test_read_region_in_bounds_spans_chunks() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(100, 120)], 16);
    let source = PyramidSource::open(dir.path()).unwrap();

    let region = source.read_region(0, 10, 20, 40, 50).unwrap();
    assert_eq!(region.dims, vec![40, 50]);
    for y in 0..40 {
        for x in 0..50 {
            assert_eq!(
                region.sample(y, x, 0),
                pattern(10 + y as u64, 20 + x as u64) as f64,
                "mismatch at ({}, {})",
                y,
                x
            );
        }
    }
}

#[test]
fn test_read_region_partially_outside_is_zero_padded() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(50, 60)], 16);
    let source = PyramidSource::open(dir.path()).unwrap();

    let region = source.read_region(0, -5, 50, 20, 20).unwrap();
    assert_eq!(region.dims, vec![20, 20]);
    for y in 0..20usize {
        for x in 0..20usize {
            let (iy, ix) = (y as i64 - 5, x as i64 + 50);
            let expected = if iy >= 0 && ix < 60 {
                pattern(iy as u64, ix as u64) as f64
            } else {
                0.0
            };
            assert_eq!(region.sample(y, x, 0), expected);
        }
    }
}

#[test]
fn test_read_region_entirely_outside_needs_no_chunks() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(32, 32)], 16);

    // Remove every chunk; an outside read must still succeed
    for name in ["0.0", "0.1", "1.0", "1.1"] {
        fs::remove_file(dir.path().join("0").join(name)).unwrap();
    }
    let source = PyramidSource::open(dir.path()).unwrap();

    let region = source.read_region(0, 1000, -1000, 10, 10).unwrap();
    assert_eq!(region.dims, vec![10, 10]);
    assert!((0..10).all(|y| (0..10).all(|x| region.sample(y, x, 0) == 0.0)));
}

#[test]
fn test_missing_chunk_reads_fill_value() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(32, 32)], 16);
    fs::remove_file(dir.path().join("0").join("1.1")).unwrap();
    let source = PyramidSource::open(dir.path()).unwrap();

    let region = source.read_region(0, 0, 0, 32, 32).unwrap();
    assert_eq!(region.sample(20, 20, 0), 0.0);
    assert_eq!(region.sample(5, 5, 0), pattern(5, 5) as f64);
}

#[test]
fn test_truncated_chunk_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(32, 32)], 16);
    fs::write(dir.path().join("0").join("0.0"), [1u8; 10]).unwrap();
    let source = PyramidSource::open(dir.path()).unwrap();

    assert!(matches!(
        source.read_region(0, 0, 0, 8, 8),
        Err(SourceError::CorruptChunk { .. })
    ));
}

#[test]
fn test_read_region_invalid_level() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(32, 32)], 16);
    let source = PyramidSource::open(dir.path()).unwrap();

    assert!(matches!(
        source.read_region(3, 0, 0, 8, 8),
        Err(SourceError::InvalidLevel { level: 3, .. })
    ));
}

#[test]
fn test_zlib_chunks() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    let spec = ArraySpec::new(&[40, 40], &[16, 16]).codec(Codec::Zlib);
    write_array_v2(dir.path(), "0", &spec, |i| pattern(i[0], i[1]) as f64);

    let source = PyramidSource::open(dir.path()).unwrap();
    let region = source.read_region(0, 30, 30, 10, 10).unwrap();
    assert_eq!(region.sample(9, 9, 0), pattern(39, 39) as f64);
}

#[test]
fn test_nested_chunk_keys() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    let spec = ArraySpec::new(&[40, 40], &[16, 16]).nested();
    write_array_v2(dir.path(), "0", &spec, |i| pattern(i[0], i[1]) as f64);
    assert!(dir.path().join("0/2/1").is_file());

    let source = PyramidSource::open(dir.path()).unwrap();
    let region = source.read_region(0, 32, 16, 8, 8).unwrap();
    assert_eq!(region.sample(7, 7, 0), pattern(39, 23) as f64);
}

#[test]
fn test_undecodable_chunk_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v2(dir.path(), json!({}));
    let spec = ArraySpec::new(&[32, 32], &[16, 16]).codec(Codec::Zlib);
    write_array_v2(dir.path(), "0", &spec, |_| 9.0);
    fs::write(dir.path().join("0").join("1.1"), b"definitely not zlib").unwrap();
    let source = PyramidSource::open(dir.path()).unwrap();

    // Chunks other than the damaged one still read
    let region = source.read_region(0, 0, 0, 16, 16).unwrap();
    assert_eq!(region.sample(15, 15, 0), 9.0);

    assert!(matches!(
        source.read_region(0, 16, 16, 16, 16),
        Err(SourceError::CorruptChunk { .. })
    ));
}

// =============================================================================
// Zarr v3
// =============================================================================

#[test]
fn test_v3_pyramid_with_gzip() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v3(dir.path(), json!({"ome": multiscales(&["0", "1"])}));
    let spec0 = ArraySpec::new(&[64, 48], &[32, 32])
        .dtype(Dtype::U16)
        .codec(Codec::Gzip);
    let spec1 = ArraySpec::new(&[32, 24], &[32, 32]).dtype(Dtype::U16);
    write_array_v3(dir.path(), "0", &spec0, |i| (i[0] * 100 + i[1]) as f64);
    write_array_v3(dir.path(), "1", &spec1, |i| (i[0] + i[1]) as f64);

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.level_count(), 2);
    assert_eq!(source.dtype(), DataType::UInt16);
    assert_eq!(source.level_shape(1).unwrap(), (32, 24));

    let region = source.read_region(0, 40, 40, 4, 4).unwrap();
    assert_eq!(region.sample(3, 3, 0), (43 * 100 + 43) as f64);
}

#[test]
fn test_v3_levels_found_without_multiscales() {
    let dir = tempfile::tempdir().unwrap();
    write_group_v3(dir.path(), json!({}));
    write_array_v3(dir.path(), "0", &ArraySpec::new(&[16, 16], &[8, 8]), |_| 3.0);

    let source = PyramidSource::open(dir.path()).unwrap();
    assert_eq!(source.level_count(), 1);
    let region = source.read_region(0, 0, 0, 2, 2).unwrap();
    assert_eq!(region.sample(1, 1, 0), 3.0);
}
