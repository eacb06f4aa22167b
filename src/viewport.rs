//! Viewport state: current level, scroll offset and canvas size.
//!
//! Offsets are in pixels of the current level and are fractional after a
//! level change rescales them. A negative offset means the image is smaller
//! than the canvas on that axis and is drawn centered.
//!
//! Level changes and zooms share one rule: pick an anchor on the canvas,
//! find the image point under it, rescale that point by the new/old extent
//! ratio and solve for the offset that keeps it under the anchor. Level
//! changes anchor at the canvas center; zooms anchor at the cursor.

use crate::pyramid::ImageExtent;

/// Canvas width used when the host reports a degenerate canvas
pub const DEFAULT_CANVAS_WIDTH: usize = 800;

/// Canvas height used when the host reports a degenerate canvas
pub const DEFAULT_CANVAS_HEIGHT: usize = 600;

/// Canvases narrower than this are treated as not laid out yet
const MIN_CANVAS_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    level: usize,
    offset_x: f64,
    offset_y: f64,
    canvas_width: usize,
    canvas_height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

impl Viewport {
    pub fn new(canvas_width: usize, canvas_height: usize) -> Self {
        let mut viewport = Self {
            level: 0,
            offset_x: 0.0,
            offset_y: 0.0,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
        };
        viewport.resize(canvas_width, canvas_height);
        viewport
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Current (x, y) offset.
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Offset truncated toward zero, as used for region requests.
    pub fn pixel_offset(&self) -> (i64, i64) {
        (self.offset_x.trunc() as i64, self.offset_y.trunc() as i64)
    }

    pub fn canvas_size(&self) -> (usize, usize) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn set_offset(&mut self, x: f64, y: f64) {
        self.offset_x = x;
        self.offset_y = y;
    }

    /// Replace the canvas size. A canvas narrower than 10 px becomes 800×600.
    pub fn resize(&mut self, canvas_width: usize, canvas_height: usize) {
        if canvas_width < MIN_CANVAS_WIDTH {
            self.canvas_width = DEFAULT_CANVAS_WIDTH;
            self.canvas_height = DEFAULT_CANVAS_HEIGHT;
        } else {
            self.canvas_width = canvas_width;
            self.canvas_height = canvas_height.max(1);
        }
    }

    /// Show `level` with the image centered on the canvas, then clamp.
    pub fn center_on(&mut self, level: usize, extent: ImageExtent) {
        self.level = level;
        self.offset_x = (extent.width as f64 - self.canvas_width as f64) / 2.0;
        self.offset_y = (extent.height as f64 - self.canvas_height as f64) / 2.0;
        self.clamp(extent);
    }

    /// Keep the view inside the image, or center an image smaller than the canvas.
    pub fn clamp(&mut self, extent: ImageExtent) {
        self.offset_x = clamp_axis(self.offset_x, extent.width as f64, self.canvas_width as f64);
        self.offset_y = clamp_axis(self.offset_y, extent.height as f64, self.canvas_height as f64);
    }

    /// Move the offset. The caller clamps before rendering.
    pub fn pan(&mut self, delta_x: f64, delta_y: f64) {
        self.offset_x += delta_x;
        self.offset_y += delta_y;
    }

    /// Switch to `new_level`, keeping the point under the canvas center fixed.
    pub fn change_level(&mut self, new_level: usize, old_extent: ImageExtent, new_extent: ImageExtent) {
        let anchor = (self.canvas_width as f64 / 2.0, self.canvas_height as f64 / 2.0);
        self.rescale_about(anchor, new_level, old_extent, new_extent);
    }

    /// Move one level finer, keeping the point under `anchor` fixed.
    ///
    /// `levels` holds the extent of every level. Returns `false` (and does
    /// nothing) at the finest level.
    pub fn zoom_in(&mut self, anchor: (f64, f64), levels: &[ImageExtent]) -> bool {
        if self.level == 0 || self.level >= levels.len() {
            return false;
        }
        let new_level = self.level - 1;
        self.rescale_about(anchor, new_level, levels[self.level], levels[new_level]);
        true
    }

    /// Move one level coarser, keeping the point under `anchor` fixed.
    ///
    /// Returns `false` (and does nothing) at the coarsest level.
    pub fn zoom_out(&mut self, anchor: (f64, f64), levels: &[ImageExtent]) -> bool {
        if self.level + 1 >= levels.len() {
            return false;
        }
        let new_level = self.level + 1;
        self.rescale_about(anchor, new_level, levels[self.level], levels[new_level]);
        true
    }

    fn rescale_about(
        &mut self,
        anchor: (f64, f64),
        new_level: usize,
        old_extent: ImageExtent,
        new_extent: ImageExtent,
    ) {
        let (ax, ay) = anchor;
        let ratio_x = ratio(new_extent.width, old_extent.width);
        let ratio_y = ratio(new_extent.height, old_extent.height);

        self.offset_x = (self.offset_x + ax) * ratio_x - ax;
        self.offset_y = (self.offset_y + ay) * ratio_y - ay;
        self.level = new_level;
        self.clamp(new_extent);
    }

    /// Map a canvas position to full-resolution pixel coordinates.
    pub fn canvas_to_level0(
        &self,
        canvas: (f64, f64),
        current: ImageExtent,
        level0: ImageExtent,
    ) -> (i64, i64) {
        let img_x = (self.offset_x + canvas.0).trunc();
        let img_y = (self.offset_y + canvas.1).trunc();
        let x0 = img_x * ratio(level0.width, current.width);
        let y0 = img_y * ratio(level0.height, current.height);
        (x0.trunc() as i64, y0.trunc() as i64)
    }

    /// `"View: (x, y) | Image: W×H"` with the offset floored at zero.
    pub fn position_readout(&self, extent: ImageExtent) -> String {
        format!(
            "View: ({}, {}) | Image: {}",
            self.offset_x.max(0.0) as i64,
            self.offset_y.max(0.0) as i64,
            extent
        )
    }
}

fn clamp_axis(offset: f64, image: f64, canvas: f64) -> f64 {
    if image <= canvas {
        (image - canvas) / 2.0
    } else {
        offset.clamp(0.0, image - canvas)
    }
}

fn ratio(new: u64, old: u64) -> f64 {
    if old == 0 {
        1.0
    } else {
        new as f64 / old as f64
    }
}
