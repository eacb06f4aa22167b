//! The currently loaded image and everything scoped to it.

use std::path::Path;

use tracing::{info, warn};

use crate::annotation::AnnotationStore;
use crate::compose::FrameComposer;
use crate::error::{RenderError, SourceError};
use crate::pyramid::{ImageExtent, PyramidSource};
use crate::tile::{Frame, TileCache, DEFAULT_TILE_CACHE_CAPACITY};
use crate::viewport::{Viewport, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};

// =============================================================================
// SessionConfig
// =============================================================================

/// Settings for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum number of cached frames
    pub cache_capacity: usize,

    /// Initial canvas width in pixels
    pub canvas_width: usize,

    /// Initial canvas height in pixels
    pub canvas_height: usize,

    /// Whether annotations start visible
    pub show_annotations: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_TILE_CACHE_CAPACITY,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            show_annotations: true,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err("canvas dimensions must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Advisory strings for the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// `"View: (x, y) | Image: W×H"`
    pub position: String,

    /// Loaded annotation count, empty when none
    pub annotations: String,

    /// `"name | W×H | dtype | N levels"`
    pub image: String,
}

struct LoadedImage {
    source: PyramidSource,
    annotations: AnnotationStore,
    extents: Vec<ImageExtent>,
}

// =============================================================================
// Session
// =============================================================================

/// Owns the loaded image, its viewport, the frame cache and annotations.
///
/// Loading a new image replaces all image-scoped state and clears the cache
/// before any read of the new image.
pub struct Session {
    cache: TileCache,
    composer: FrameComposer,
    viewport: Viewport,
    image: Option<LoadedImage>,
    show_annotations: bool,
    last_frame: Option<Frame>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            cache: TileCache::with_capacity(config.cache_capacity),
            composer: FrameComposer::new(),
            viewport: Viewport::new(config.canvas_width, config.canvas_height),
            image: None,
            show_annotations: config.show_annotations,
            last_frame: None,
        }
    }

    /// Open `locator` and make it the current image, centered at its coarsest level.
    ///
    /// On failure the previous image stays loaded (with an empty cache).
    pub fn load(&mut self, locator: impl AsRef<Path>) -> Result<(), SourceError> {
        self.cache.clear();

        let source = PyramidSource::open(locator)?;
        let annotations = AnnotationStore::from_source(&source);
        let extents = source.levels().iter().map(|l| l.extent()).collect::<Vec<_>>();

        let (width, height) = self.viewport.canvas_size();
        let mut viewport = Viewport::new(width, height);
        let coarsest = extents.len() - 1;
        viewport.center_on(coarsest, extents[coarsest]);

        info!(
            image = %source.summary(),
            annotations = annotations.len(),
            level = coarsest,
            "image loaded"
        );

        self.viewport = viewport;
        self.last_frame = None;
        self.image = Some(LoadedImage {
            source,
            annotations,
            extents,
        });
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    pub fn source(&self) -> Option<&PyramidSource> {
        self.image.as_ref().map(|i| &i.source)
    }

    pub fn annotations(&self) -> Option<&AnnotationStore> {
        self.image.as_ref().map(|i| &i.annotations)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn annotations_visible(&self) -> bool {
        self.show_annotations
    }

    /// Render the current view.
    ///
    /// Failures degrade to the previous frame when it still fits the canvas,
    /// otherwise to a blank frame.
    pub fn render(&mut self) -> Result<Frame, RenderError> {
        let image = self.image.as_ref().ok_or(RenderError::NoImageLoaded)?;

        let result = self.composer.render(
            &mut self.viewport,
            &image.source,
            &self.cache,
            &image.annotations,
            self.show_annotations,
        );

        match result {
            Ok(frame) => {
                self.last_frame = Some(frame.clone());
                Ok(frame)
            }
            Err(e) => {
                let (width, height) = self.viewport.canvas_size();
                warn!(error = %e, "render failed, showing fallback frame");
                Ok(match &self.last_frame {
                    Some(frame) if frame.width() == width && frame.height() == height => frame.clone(),
                    _ => Frame::blank(height, width),
                })
            }
        }
    }

    /// Scroll by a canvas-pixel delta.
    pub fn pan(&mut self, delta_x: f64, delta_y: f64) {
        self.viewport.pan(delta_x, delta_y);
    }

    /// One level finer around the cursor. Returns whether the level changed.
    pub fn zoom_in(&mut self, anchor: (f64, f64)) -> bool {
        match &self.image {
            Some(image) => self.viewport.zoom_in(anchor, &image.extents),
            None => false,
        }
    }

    /// One level coarser around the cursor. Returns whether the level changed.
    pub fn zoom_out(&mut self, anchor: (f64, f64)) -> bool {
        match &self.image {
            Some(image) => self.viewport.zoom_out(anchor, &image.extents),
            None => false,
        }
    }

    /// Jump to `level`, keeping the canvas center fixed.
    pub fn set_level(&mut self, level: usize) -> Result<(), SourceError> {
        let Some(image) = &self.image else {
            return Err(SourceError::InvalidLevel { level, count: 0 });
        };
        let count = image.extents.len();
        if level >= count {
            return Err(SourceError::InvalidLevel { level, count });
        }

        let current = self.viewport.level();
        if level != current {
            self.viewport
                .change_level(level, image.extents[current], image.extents[level]);
        }
        Ok(())
    }

    pub fn resize(&mut self, canvas_width: usize, canvas_height: usize) {
        self.viewport.resize(canvas_width, canvas_height);
    }

    /// Re-center the image at the current level.
    pub fn center(&mut self) {
        if let Some(image) = &self.image {
            let level = self.viewport.level();
            self.viewport.center_on(level, image.extents[level]);
        }
    }

    /// Flip annotation visibility and return the new state.
    pub fn toggle_annotations(&mut self) -> bool {
        self.show_annotations = !self.show_annotations;
        self.show_annotations
    }

    pub fn set_annotations_visible(&mut self, visible: bool) {
        self.show_annotations = visible;
    }

    /// Full-resolution coordinates under a canvas position.
    pub fn pointer_readout(&self, canvas: (f64, f64)) -> Option<String> {
        let image = self.image.as_ref()?;
        let level = self.viewport.level();
        let (x0, y0) = self
            .viewport
            .canvas_to_level0(canvas, image.extents[level], image.extents[0]);
        Some(format!(
            "Position: ({}, {}) @ level 0 | Current level: {}",
            x0, y0, level
        ))
    }

    pub fn status(&self) -> Option<SessionStatus> {
        let image = self.image.as_ref()?;
        let level = self.viewport.level();
        Some(SessionStatus {
            position: self.viewport.position_readout(image.extents[level]),
            annotations: image.annotations.count_label(),
            image: image.source.summary(),
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
