//! Frame composition.
//!
//! The FrameComposer produces one display frame per render request:
//!
//! ```text
//! Viewport ── clamp ──► CacheKey ──► TileCache ──hit──────────────┐
//!                                       │ miss                    │
//!                                       ▼                         ▼
//!                               RegionExtractor ──► put ──► Frame ──► OverlayRenderer
//! ```

use tracing::debug;

use crate::annotation::{AnnotationStore, OverlayRenderer, OverlayTransform};
use crate::error::{ExtractError, RenderError};
use crate::pyramid::PyramidSource;
use crate::tile::{CacheKey, Frame, RegionExtractor, TileCache};
use crate::viewport::Viewport;

/// Orchestrates cache lookup, extraction and annotation overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameComposer {
    extractor: RegionExtractor,
}

impl FrameComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the canvas-sized frame the viewport currently shows.
    ///
    /// The viewport is clamped first. The extracted frame (without overlay)
    /// is cached; the overlay is drawn fresh each time.
    pub fn render(
        &self,
        viewport: &mut Viewport,
        source: &PyramidSource,
        cache: &TileCache,
        annotations: &AnnotationStore,
        show_annotations: bool,
    ) -> Result<Frame, RenderError> {
        let level = viewport.level();
        let extent = source
            .level_extent(level)
            .map_err(|e| RenderError::Extract(ExtractError::Source(e)))?;
        viewport.clamp(extent);

        let (x, y) = viewport.pixel_offset();
        let (width, height) = viewport.canvas_size();
        let key = CacheKey::new(source.identity().clone(), level, x, y, width, height);

        let frame = match cache.get(&key) {
            Some(frame) => {
                debug!(level, x, y, "frame cache hit");
                frame
            }
            None => {
                let frame = self.extractor.extract(source, level, y, x, height, width)?;
                cache.put(key, frame.clone());
                frame
            }
        };

        if !matches!(frame.channels(), 1 | 3 | 4) {
            return Err(RenderError::UnexpectedChannels(frame.channels()));
        }

        if show_annotations && !annotations.is_empty() {
            let level0 = source
                .level_extent(0)
                .map_err(|e| RenderError::Extract(ExtractError::Source(e)))?;
            let transform = OverlayTransform::new(level0.width, extent.width, viewport.offset());
            return OverlayRenderer::new(transform).render(annotations, &frame);
        }

        Ok(frame)
    }
}
