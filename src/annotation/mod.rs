//! Vector annotations drawn over the image.
//!
//! Annotations are GeoJSON FeatureCollections in level-0 pixel coordinates,
//! found as sidecar documents next to the image data or embedded in the
//! root attributes. Documents may declare annotation levels with per-class
//! colors under `properties.annotation_levels`.

mod color;
mod model;
mod render;
mod store;

pub use color::{keyword_color, parse_hex, FALLBACK_COLOR, LEVEL_DEFAULT_COLOR};
pub use model::{AnnotationFeature, AnnotationLevelStyle, ClassStyle, Coord, Geometry};
pub use render::{OverlayRenderer, OverlayTransform};
pub use store::AnnotationStore;
