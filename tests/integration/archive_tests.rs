//! Archive-backed pyramid tests.
//!
//! Tests verify:
//! - Pyramids open from ZIP archives with the root at the top or nested
//! - Stored and deflated entries read identically to the directory form
//! - Only the central directory and touched entries are read
//! - Sidecar annotations are discovered inside archives

use serde_json::json;

use pyramid_view::annotation::AnnotationStore;
use pyramid_view::format::ContainerKind;
use pyramid_view::pyramid::{ArchiveStore, PyramidSource};

use super::test_utils::{
    build_zip, pattern, write_annotations, write_array_v3, write_gray_pyramid, write_group_v3,
    zip_directory, ArraySpec, TrackingReader,
};

fn assert_same_region(a: &PyramidSource, b: &PyramidSource, level: usize) {
    let (h, w) = a.level_shape(level).unwrap();
    let ra = a.read_region(level, 0, 0, h as usize, w as usize).unwrap();
    let rb = b.read_region(level, 0, 0, h as usize, w as usize).unwrap();
    assert_eq!(ra, rb);
}

#[test]
fn test_open_archive_at_top_level() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    write_gray_pyramid(&tree, &[(80, 100), (40, 50)], 32);
    let archive = dir.path().join("image.zip");
    zip_directory(&tree, &archive, "", false);

    let zipped = PyramidSource::open(&archive).unwrap();
    let plain = PyramidSource::open(&tree).unwrap();

    assert_eq!(zipped.container_kind(), ContainerKind::ZipArchive);
    assert_eq!(zipped.level_count(), 2);
    assert_eq!(zipped.level_shape(0).unwrap(), (80, 100));
    assert_same_region(&zipped, &plain, 0);
    assert_same_region(&zipped, &plain, 1);
}

#[test]
fn test_open_archive_with_nested_root() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    write_gray_pyramid(&tree, &[(64, 64)], 16);
    let archive = dir.path().join("nested.zip");
    zip_directory(&tree, &archive, "export/slide.ome.zarr", true);

    let source = PyramidSource::open(&archive).unwrap();
    assert_eq!(source.level_count(), 1);

    let region = source.read_region(0, 60, 60, 8, 8).unwrap();
    assert_eq!(region.sample(3, 3, 0), pattern(63, 63) as f64);
    assert_eq!(region.sample(4, 4, 0), 0.0);
}

#[test]
fn test_archive_v3_pyramid() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    write_group_v3(&tree, json!({}));
    write_array_v3(&tree, "0", &ArraySpec::new(&[30, 30], &[16, 16]), |i| {
        pattern(i[0], i[1]) as f64
    });
    let archive = dir.path().join("v3.zip");
    zip_directory(&tree, &archive, "data", false);

    let source = PyramidSource::open(&archive).unwrap();
    let region = source.read_region(0, 17, 17, 2, 2).unwrap();
    assert_eq!(region.sample(1, 1, 0), pattern(18, 18) as f64);
}

#[test]
fn test_archive_store_reads_only_touched_entries() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    write_gray_pyramid(&tree, &[(512, 512)], 32);

    let mut files = Vec::new();
    for entry in ["", "0"] {
        for name in std::fs::read_dir(tree.join(entry)).unwrap() {
            let path = name.unwrap().path();
            if path.is_file() {
                let rel = path.strip_prefix(&tree).unwrap().to_string_lossy().replace('\\', "/");
                files.push((rel, std::fs::read(&path).unwrap()));
            }
        }
    }
    files.sort_by_key(|(name, _)| (name.matches('/').count(), name.clone()));
    let data = build_zip(&files, false);
    let total = data.len() as u64;

    let reader = TrackingReader::new(data);
    let store = ArchiveStore::from_reader(&reader).unwrap();
    assert_eq!(store.root(), "");

    reader.reset();
    let chunk = store.get("0/3.4").unwrap().unwrap();
    assert_eq!(chunk.len(), 32 * 32);
    assert_eq!(chunk[0], pattern(96, 128));

    // One local header and one payload
    assert!(reader.bytes_read() < 2 * 1024);
    assert!(reader.bytes_read() < total / 100);
    assert!(store.get("0/99.99").unwrap().is_none());
}

#[test]
fn test_archive_annotations_are_discovered() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("tree");
    write_gray_pyramid(&tree, &[(64, 64)], 32);
    write_annotations(
        &tree.join("regions.geojson"),
        &json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [10, 10]}, "properties": {}}
            ]
        }),
    );
    write_annotations(
        &tree.join("annotations_extra.json"),
        &json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [20, 20]}, "properties": {}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [30, 30]}, "properties": {}}
            ]
        }),
    );
    // Not an annotation document by name
    write_annotations(&tree.join("notes.json"), &json!({"type": "FeatureCollection", "features": []}));

    let archive = dir.path().join("annotated.zip");
    zip_directory(&tree, &archive, "slide", true);

    let source = PyramidSource::open(&archive).unwrap();
    let names: Vec<String> = source
        .annotation_documents()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|n| !n.ends_with("notes.json")));

    let store = AnnotationStore::from_source(&source);
    assert_eq!(store.len(), 3);
}
