//! # pyramid-view
//!
//! A viewing engine for multi-resolution OME-Zarr images.
//!
//! This library opens image pyramids stored as plain directories or inside
//! ZIP archives and produces canvas-sized display frames for any viewport,
//! reading only the chunks the view touches. GeoJSON annotations stored
//! alongside the image are drawn over the frames.
//!
//! ## Features
//!
//! - **Random-access archives**: ZIP containers are read through a block
//!   cache; only the central directory and requested entries are touched
//! - **Zarr v2 and v3**: arrays are read through `zarrs`, with raw, zlib and
//!   gzip chunks of every integer and float sample type
//! - **Stable navigation**: pan, level switches that keep the canvas center
//!   fixed, and cursor-anchored zoom
//! - **Annotation overlays**: polygons, points and lines colored by level
//!   styles, class names or explicit colors
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - Positioned file reads and block caching
//! - [`mod@format`] - Container detection, ZIP central directory, node documents and dtypes
//! - [`pyramid`] - Pyramid sources, levels and region reads
//! - [`tile`] - Frame extraction and the frame cache
//! - [`viewport`] - Offset, level and canvas state
//! - [`annotation`] - Annotation loading, color resolution and overlay drawing
//! - [`compose`] / [`session`] - One render per request, scoped to the loaded image
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pyramid_view::{Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.load("slide.ome.zarr").unwrap();
//!
//! session.zoom_in((400.0, 300.0));
//! session.pan(120.0, -40.0);
//!
//! let frame = session.render().unwrap();
//! frame.to_image().unwrap().save("view.png").unwrap();
//! ```

pub mod annotation;
pub mod compose;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod pyramid;
pub mod session;
pub mod tile;
pub mod viewport;

// Re-export commonly used types
pub use annotation::{
    AnnotationFeature, AnnotationLevelStyle, AnnotationStore, Geometry, OverlayRenderer,
    OverlayTransform,
};
pub use compose::FrameComposer;
pub use config::{Cli, Command, InfoConfig, RenderConfig};
pub use error::{
    AnnotationParseError, ArchiveError, ExtractError, IoError, LayoutError, RenderError, SourceError,
};
pub use format::{detect_container, ContainerKind, DataType};
pub use io::{BlockCache, FileRangeReader, RangeReader};
pub use pyramid::{AxisLayout, ImageExtent, PyramidLevel, PyramidSource, RawRegion};
pub use session::{Session, SessionConfig, SessionStatus};
pub use tile::{CacheKey, Frame, RegionExtractor, TileCache, DEFAULT_TILE_CACHE_CAPACITY};
pub use viewport::Viewport;
