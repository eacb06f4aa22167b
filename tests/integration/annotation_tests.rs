//! Annotation integration tests.
//!
//! Tests verify:
//! - Sidecar discovery order and embedded annotation attributes
//! - Color resolution across explicit colors, level styles and keywords
//! - Malformed documents are skipped without affecting the rest
//! - Overlay drawing lands where the level transform puts it

use std::fs;

use serde_json::{json, Value};

use pyramid_view::annotation::{
    AnnotationStore, OverlayRenderer, OverlayTransform, FALLBACK_COLOR, LEVEL_DEFAULT_COLOR,
};
use pyramid_view::pyramid::PyramidSource;
use pyramid_view::tile::Frame;

use super::test_utils::{multiscales, write_annotations, write_gray_pyramid, write_group_v2};

fn point(x: f64, y: f64, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [x, y]},
        "properties": properties,
    })
}

fn square(x: f64, y: f64, size: f64, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]],
        },
        "properties": properties,
    })
}

fn collection(features: Vec<Value>, levels: Value) -> Value {
    json!({
        "type": "FeatureCollection",
        "properties": {"annotation_levels": levels},
        "features": features,
    })
}

// =============================================================================
// Color Resolution
// =============================================================================

fn styled_store() -> AnnotationStore {
    let levels = json!([
        {
            "id": 1,
            "color": "#112233",
            "classes": [
                {"name": "Tumor", "color": "#AA0000"},
                {"name": "Stroma"}
            ]
        },
        {"id": "bare", "classes": []}
    ]);
    let features = vec![
        point(0.0, 0.0, json!({"color": "#123456", "level_id": 1, "class_name": "Tumor"})),
        point(0.0, 0.0, json!({"level_id": 1, "class_name": "Tumor"})),
        point(0.0, 0.0, json!({"level_id": "1", "class_name": "Stroma"})),
        point(0.0, 0.0, json!({"level_id": 1, "class_name": "Unknown"})),
        point(0.0, 0.0, json!({"level_id": "bare", "class_name": "vessel"})),
        point(0.0, 0.0, json!({"level_id": 7, "class_name": "Blood Vessel"})),
        point(0.0, 0.0, json!({"class_name": "nothing special"})),
        point(0.0, 0.0, json!({})),
    ];

    let mut store = AnnotationStore::new();
    store
        .load_value("styled.geojson", &collection(features, levels))
        .unwrap();
    store
}

#[test]
fn test_color_resolution_priority() {
    let store = styled_store();
    let colors: Vec<&str> = store
        .features()
        .iter()
        .map(|f| store.resolve_color(f))
        .collect();

    assert_eq!(
        colors,
        vec![
            "#123456",           // explicit
            "#AA0000",           // level class color
            "#112233",           // class without color takes the level color
            "#112233",           // unknown class takes the level color
            LEVEL_DEFAULT_COLOR, // level without color
            "#00BCD4",           // unknown level, keyword match
            FALLBACK_COLOR,      // no keyword
            FALLBACK_COLOR,      // nothing at all
        ]
    );
}

#[test]
fn test_level_id_zero_falls_through_to_keywords() {
    let levels = json!([{"id": 0, "color": "#0000FF", "classes": [{"name": "Vessel", "color": "#222222"}]}]);
    let features = vec![
        point(0.0, 0.0, json!({"level_id": 0, "class_name": "Vessel"})),
        point(0.0, 0.0, json!({"level_id": 0, "class_name": "Stroma"})),
        point(0.0, 0.0, json!({"level_id": "0", "class_name": "Vessel"})),
    ];
    let mut store = AnnotationStore::new();
    store
        .load_value("zero.geojson", &collection(features, levels))
        .unwrap();

    assert!(store.level_style("0").is_some());
    let colors: Vec<&str> = store
        .features()
        .iter()
        .map(|f| store.resolve_color(f))
        .collect();
    assert_eq!(colors, vec!["#00BCD4", FALLBACK_COLOR, "#222222"]);
}

#[test]
fn test_numeric_and_string_level_ids_match() {
    let store = styled_store();
    assert!(store.level_style("1").is_some());
    assert!(store.level_style("bare").is_some());
    assert_eq!(store.level_count(), 2);
}

// =============================================================================
// Discovery
// =============================================================================

#[test]
fn test_directory_sidecars_and_embedded_attribute() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(64, 64)], 32);

    // Embedded annotations as a JSON string inside the root attributes
    let mut attrs = multiscales(&["0"]);
    let embedded = collection(vec![point(5.0, 5.0, json!({}))], json!([]));
    attrs["annotations"] = Value::String(embedded.to_string());
    write_group_v2(dir.path(), attrs);

    write_annotations(
        &dir.path().join("cells.geojson"),
        &collection(
            vec![point(1.0, 1.0, json!({})), point(2.0, 2.0, json!({}))],
            json!([]),
        ),
    );
    write_annotations(
        &dir.path().join("regions.json"),
        &collection(vec![square(0.0, 0.0, 10.0, json!({}))], json!([])),
    );
    // Valid JSON that is not a FeatureCollection contributes nothing
    fs::write(dir.path().join("metadata.json"), br#"{"scanner": "x"}"#).unwrap();
    // Broken JSON is skipped
    fs::write(dir.path().join("broken.json"), b"{ not json").unwrap();

    let source = PyramidSource::open(dir.path()).unwrap();
    let store = AnnotationStore::from_source(&source);

    assert_eq!(store.len(), 4);
    assert_eq!(store.skipped_documents(), 1);
    assert_eq!(store.count_label(), "4 annotation(s)");
}

#[test]
fn test_embedded_attribute_as_object() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(64, 64)], 32);
    let mut attrs = multiscales(&["0"]);
    attrs["annotations"] = collection(vec![point(5.0, 5.0, json!({}))], json!([]));
    write_group_v2(dir.path(), attrs);

    let source = PyramidSource::open(dir.path()).unwrap();
    let store = AnnotationStore::from_source(&source);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_no_annotations() {
    let dir = tempfile::tempdir().unwrap();
    write_gray_pyramid(dir.path(), &[(64, 64)], 32);

    let source = PyramidSource::open(dir.path()).unwrap();
    let store = AnnotationStore::from_source(&source);
    assert!(store.is_empty());
    assert_eq!(store.count_label(), "");
}

#[test]
fn test_unsupported_geometry_is_counted() {
    let mut store = AnnotationStore::new();
    let doc = json!({
        "type": "FeatureCollection",
        "features": [
            point(1.0, 1.0, json!({})),
            {"type": "Feature", "geometry": {"type": "GeometryCollection", "geometries": []}, "properties": {}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": ["a", "b"]}, "properties": {}}
        ]
    });

    assert_eq!(store.load_value("mixed.geojson", &doc).unwrap(), 1);
    assert_eq!(store.skipped_features(), 2);
}

#[test]
fn test_malformed_levels_leave_store_unchanged() {
    let mut store = styled_store();
    let before = store.len();

    let doc = collection(vec![point(1.0, 1.0, json!({}))], json!("not a list"));
    assert!(store.load_value("bad.geojson", &doc).is_err());
    assert_eq!(store.len(), before);
}

// =============================================================================
// Overlay
// =============================================================================

#[test]
fn test_overlay_scales_level0_coordinates() {
    let mut store = AnnotationStore::new();
    store
        .load_value(
            "one.geojson",
            &collection(
                vec![square(400.0, 400.0, 200.0, json!({"color": "#FF0000"}))],
                json!([]),
            ),
        )
        .unwrap();

    // Level 0 is 4× the current level; the view is scrolled by (50, 50)
    let transform = OverlayTransform::new(4000, 1000, (50.0, 50.0));
    let frame = Frame::blank(100, 100);
    let out = OverlayRenderer::new(transform).render(&store, &frame).unwrap();

    // The square covers canvas (50..100, 50..100) at this level
    assert_eq!(out.channels(), 3);
    assert_eq!(out.rgb(75, 75), [50, 0, 0]);
    assert_eq!(out.rgb(20, 20), [0, 0, 0]);
    // Outline is opaque
    assert_eq!(out.rgb(75, 50), [255, 0, 0]);
}

#[test]
fn test_overlay_point_and_offscreen_cull() {
    let mut store = AnnotationStore::new();
    store
        .load_value(
            "points.geojson",
            &collection(
                vec![
                    point(20.0, 30.0, json!({"color": "#00FF00"})),
                    point(5000.0, 5000.0, json!({"color": "#0000FF"})),
                ],
                json!([]),
            ),
        )
        .unwrap();

    let transform = OverlayTransform::new(100, 100, (0.0, 0.0));
    let renderer = OverlayRenderer::new(transform);
    let layer = renderer.draw_layer(&store, 64, 64);

    assert_eq!(layer.get_pixel(20, 30).0, [0, 255, 0, 200]);
    assert_eq!(layer.get_pixel(26, 30).0, [255, 255, 255, 255]);
    assert!(layer.pixels().all(|p| p.0[2] == 0 || p.0 == [255, 255, 255, 255]));
}

#[test]
fn test_overlay_handles_coordinates_far_outside() {
    let mut store = AnnotationStore::new();
    let line = json!({
        "type": "Feature",
        "geometry": {"type": "LineString", "coordinates": [[-1.0e9, 10.0], [1.0e9, 10.0]]},
        "properties": {"color": "#FFFFFF"}
    });
    store
        .load_value("line.geojson", &collection(vec![line], json!([])))
        .unwrap();

    let renderer = OverlayRenderer::new(OverlayTransform::new(100, 100, (0.0, 0.0)));
    let out = renderer.render(&store, &Frame::blank(20, 40)).unwrap();
    assert_eq!(out.rgb(10, 0), [255, 255, 255]);
    assert_eq!(out.rgb(10, 39), [255, 255, 255]);
    assert_eq!(out.rgb(0, 20), [0, 0, 0]);
}
