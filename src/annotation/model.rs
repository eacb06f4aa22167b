//! Annotation features and level styles, parsed from GeoJSON.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AnnotationParseError;

/// `(x, y)` in level-0 pixel coordinates.
pub type Coord = (f64, f64);

/// Feature geometry. Polygons keep all rings; only the exterior is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    pub const fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// One annotation with the properties that drive its color.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationFeature {
    pub geometry: Geometry,

    /// Explicit `color` property
    pub color: Option<String>,

    /// `level_id` property, normalized to a string
    pub level_id: Option<String>,

    /// `class_name` property
    pub class_name: Option<String>,

    /// Full property bag
    pub properties: Map<String, Value>,
}

/// A class-name color override inside a level style.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassStyle {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A declared annotation level: default color plus per-class overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationLevelStyle {
    pub id: String,
    pub color: Option<String>,
    pub classes: Vec<ClassStyle>,
}

#[derive(Deserialize)]
struct LevelRecord {
    id: Value,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    classes: Vec<ClassStyle>,
}

/// Level ids may be integers or strings; both compare by their text.
pub fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A feature's `level_id`; falsy values (`0`, `""`, `false`, `null`) reference no level.
fn level_reference(value: &Value) -> Option<String> {
    let falsy = match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if falsy {
        None
    } else {
        normalize_id(value)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Outcome of parsing one FeatureCollection.
#[derive(Debug, Default)]
pub struct ParsedCollection {
    pub features: Vec<AnnotationFeature>,
    pub levels: Vec<AnnotationLevelStyle>,
    /// Features with unsupported or malformed geometry
    pub skipped_features: usize,
}

/// Parse a document value.
///
/// Returns `Ok(None)` for JSON that is not a FeatureCollection; such
/// documents are not annotations at all.
pub fn parse_collection(
    document: &str,
    value: &Value,
) -> Result<Option<ParsedCollection>, AnnotationParseError> {
    if value.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Ok(None);
    }

    let mut parsed = ParsedCollection::default();

    if let Some(records) = value.get("properties").and_then(|p| p.get("annotation_levels")) {
        let records: Vec<LevelRecord> =
            serde_json::from_value(records.clone()).map_err(|e| AnnotationParseError::LevelRecord {
                document: document.to_string(),
                message: e.to_string(),
            })?;
        for record in records {
            let id = normalize_id(&record.id).ok_or_else(|| AnnotationParseError::LevelRecord {
                document: document.to_string(),
                message: format!("level id must be a string or number, got {}", record.id),
            })?;
            parsed.levels.push(AnnotationLevelStyle {
                id,
                color: record.color,
                classes: record.classes,
            });
        }
    }

    let features = match value.get("features") {
        None | Some(Value::Null) => return Ok(Some(parsed)),
        Some(Value::Array(features)) => features,
        Some(other) => {
            return Err(AnnotationParseError::Feature {
                document: document.to_string(),
                message: format!("features must be an array, got {}", type_name(other)),
            })
        }
    };

    for (index, feature) in features.iter().enumerate() {
        match parse_feature(feature) {
            Some(f) => parsed.features.push(f),
            None => {
                tracing::debug!(document, index, "skipping feature with unsupported geometry");
                parsed.skipped_features += 1;
            }
        }
    }

    Ok(Some(parsed))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_feature(feature: &Value) -> Option<AnnotationFeature> {
    let geometry = parse_geometry(feature.get("geometry")?)?;
    let properties = feature
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Some(AnnotationFeature {
        geometry,
        color: properties.get("color").and_then(Value::as_str).map(str::to_string),
        level_id: properties.get("level_id").and_then(level_reference),
        class_name: properties
            .get("class_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        properties,
    })
}

fn parse_geometry(geometry: &Value) -> Option<Geometry> {
    let coords = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Point" => Some(Geometry::Point(position(coords)?)),
        "LineString" => Some(Geometry::LineString(positions(coords)?)),
        "Polygon" => Some(Geometry::Polygon(rings(coords)?)),
        "MultiPolygon" => Some(Geometry::MultiPolygon(
            coords.as_array()?.iter().map(rings).collect::<Option<_>>()?,
        )),
        _ => None,
    }
}

/// A position: at least two numbers, extra dimensions ignored.
fn position(value: &Value) -> Option<Coord> {
    let array = value.as_array()?;
    Some((array.first()?.as_f64()?, array.get(1)?.as_f64()?))
}

fn positions(value: &Value) -> Option<Vec<Coord>> {
    value.as_array()?.iter().map(position).collect()
}

fn rings(value: &Value) -> Option<Vec<Vec<Coord>>> {
    value.as_array()?.iter().map(positions).collect()
}
