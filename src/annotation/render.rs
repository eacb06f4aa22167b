//! Overlay rasterization.
//!
//! Features are drawn onto a transparent RGBA layer the size of the frame.
//! Drawing replaces layer pixels; the finished layer is then composited
//! source-over onto the frame, producing an RGB frame.

use image::{Rgba, RgbaImage};

use crate::error::RenderError;
use crate::tile::Frame;

use super::color::parse_or_fallback;
use super::model::{Coord, Geometry};
use super::store::AnnotationStore;

const POLYGON_FILL_ALPHA: u8 = 50;
const OUTLINE_ALPHA: u8 = 255;
const STROKE_WIDTH: i64 = 2;
const POINT_RADIUS: f64 = 6.0;
const POINT_FILL_ALPHA: u8 = 200;
const POINT_CULL_MARGIN: f64 = 10.0;

/// Maps level-0 coordinates to canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl OverlayTransform {
    /// Transform for a view of a level `current_width` wide, scrolled to `offset`.
    pub fn new(level0_width: u64, current_width: u64, offset: (f64, f64)) -> Self {
        let scale = if level0_width == 0 {
            1.0
        } else {
            current_width as f64 / level0_width as f64
        };
        Self {
            scale,
            offset_x: offset.0,
            offset_y: offset.1,
        }
    }

    pub fn apply(&self, (x, y): Coord) -> Coord {
        (x * self.scale - self.offset_x, y * self.scale - self.offset_y)
    }
}

/// Draws an [`AnnotationStore`] over frames.
#[derive(Debug, Clone, Copy)]
pub struct OverlayRenderer {
    transform: OverlayTransform,
}

impl OverlayRenderer {
    pub fn new(transform: OverlayTransform) -> Self {
        Self { transform }
    }

    /// Rasterize every visible feature onto a transparent layer.
    pub fn draw_layer(&self, store: &AnnotationStore, width: u32, height: u32) -> RgbaImage {
        let mut layer = RgbaImage::new(width, height);

        for feature in store.features() {
            let [r, g, b] = parse_or_fallback(store.resolve_color(feature));
            match &feature.geometry {
                Geometry::Polygon(rings) => {
                    if let Some(exterior) = rings.first() {
                        self.draw_polygon(&mut layer, exterior, [r, g, b]);
                    }
                }
                Geometry::MultiPolygon(polygons) => {
                    for exterior in polygons.iter().filter_map(|rings| rings.first()) {
                        self.draw_polygon(&mut layer, exterior, [r, g, b]);
                    }
                }
                Geometry::Point(coord) => self.draw_point(&mut layer, *coord, [r, g, b]),
                Geometry::LineString(coords) => self.draw_line(&mut layer, coords, [r, g, b]),
            }
        }

        layer
    }

    /// Composite the overlay onto `frame`.
    pub fn render(&self, store: &AnnotationStore, frame: &Frame) -> Result<Frame, RenderError> {
        let (w, h) = (frame.width(), frame.height());
        let layer = self.draw_layer(store, w as u32, h as u32);

        let mut out = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let [r, g, b] = frame.rgb(y, x);
                let src = *layer.get_pixel(x as u32, y as u32);
                let blended = alpha_blend(Rgba([r, g, b, 255]), src);
                out.extend_from_slice(&blended.0[..3]);
            }
        }

        Frame::new(h, w, 3, out)
    }

    fn canvas_points(&self, coords: &[Coord]) -> Vec<Coord> {
        coords.iter().map(|&c| self.transform.apply(c)).collect()
    }

    fn draw_polygon(&self, layer: &mut RgbaImage, ring: &[Coord], [r, g, b]: [u8; 3]) {
        let points = self.canvas_points(ring);
        if points.len() < 3 || !intersects_canvas(&points, layer, 0.0) {
            return;
        }

        fill_polygon(layer, &points, Rgba([r, g, b, POLYGON_FILL_ALPHA]));
        let outline = Rgba([r, g, b, OUTLINE_ALPHA]);
        for i in 0..points.len() {
            let j = (i + 1) % points.len();
            draw_segment(layer, points[i], points[j], outline);
        }
    }

    fn draw_point(&self, layer: &mut RgbaImage, coord: Coord, [r, g, b]: [u8; 3]) {
        let center = self.transform.apply(coord);
        if !intersects_canvas(&[center], layer, POINT_CULL_MARGIN) {
            return;
        }
        draw_disc(
            layer,
            center,
            POINT_RADIUS,
            Rgba([r, g, b, POINT_FILL_ALPHA]),
            Rgba([255, 255, 255, 255]),
        );
    }

    fn draw_line(&self, layer: &mut RgbaImage, coords: &[Coord], [r, g, b]: [u8; 3]) {
        let points = self.canvas_points(coords);
        if points.len() < 2 || !intersects_canvas(&points, layer, 0.0) {
            return;
        }
        let color = Rgba([r, g, b, OUTLINE_ALPHA]);
        for pair in points.windows(2) {
            draw_segment(layer, pair[0], pair[1], color);
        }
    }
}

// =============================================================================
// Raster primitives
// =============================================================================

/// Whether the bounding box of `points`, grown by `margin`, touches the layer.
fn intersects_canvas(points: &[Coord], layer: &RgbaImage, margin: f64) -> bool {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let (w, h) = (layer.width() as f64, layer.height() as f64);
    !(max_x < -margin || min_x > w + margin || max_y < -margin || min_y > h + margin)
}

fn put(layer: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < layer.width() && (y as u32) < layer.height() {
        layer.put_pixel(x as u32, y as u32, color);
    }
}

/// Even-odd scanline fill, sampling each row at its pixel center.
fn fill_polygon(layer: &mut RgbaImage, points: &[Coord], color: Rgba<u8>) {
    let (w, h) = (layer.width(), layer.height());
    let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let row_start = min_y.floor().max(0.0) as u32;
    let row_end = (max_y.ceil().max(0.0) as u32).min(h);

    let n = points.len();
    let mut nodes: Vec<f64> = Vec::new();
    for y in row_start..row_end {
        let yf = y as f64 + 0.5;
        nodes.clear();
        for i in 0..n {
            let j = (i + 1) % n;
            let (xi, yi) = points[i];
            let (xj, yj) = points[j];
            if (yi < yf && yj >= yf) || (yj < yf && yi >= yf) {
                let t = (yf - yi) / (yj - yi);
                nodes.push(xi + t * (xj - xi));
            }
        }
        nodes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        for pair in nodes.chunks_exact(2) {
            let x_start = (pair[0].round().max(0.0) as u32).min(w);
            let x_end = (pair[1].round().max(0.0) as u32).min(w);
            for x in x_start..x_end {
                layer.put_pixel(x, y, color);
            }
        }
    }
}

/// Clip a segment to `[lo, hi]` on both axes (Liang-Barsky).
fn clip_segment(p0: Coord, p1: Coord, lo: f64, hi_x: f64, hi_y: f64) -> Option<(Coord, Coord)> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, p0.0 - lo),
        (dx, hi_x - p0.0),
        (-dy, p0.1 - lo),
        (dy, hi_y - p0.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    (t0 <= t1).then(|| {
        (
            (p0.0 + t0 * dx, p0.1 + t0 * dy),
            (p0.0 + t1 * dx, p0.1 + t1 * dy),
        )
    })
}

/// Bresenham segment stamped with a square pen of [`STROKE_WIDTH`].
fn draw_segment(layer: &mut RgbaImage, p0: Coord, p1: Coord, color: Rgba<u8>) {
    let pad = STROKE_WIDTH as f64;
    let Some((a, b)) = clip_segment(
        p0,
        p1,
        -pad,
        layer.width() as f64 + pad,
        layer.height() as f64 + pad,
    ) else {
        return;
    };

    let (mut x0, mut y0) = (a.0.round() as i64, a.1.round() as i64);
    let (x1, y1) = (b.0.round() as i64, b.1.round() as i64);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let lead = STROKE_WIDTH / 2;

    loop {
        for oy in 0..STROKE_WIDTH {
            for ox in 0..STROKE_WIDTH {
                put(layer, x0 - lead + ox, y0 - lead + oy, color);
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Filled disc with a one-pixel outline ring.
fn draw_disc(layer: &mut RgbaImage, (cx, cy): Coord, radius: f64, fill: Rgba<u8>, outline: Rgba<u8>) {
    let inner = (radius - 1.0) * (radius - 1.0);
    let outer = radius * radius;
    let (x_min, x_max) = ((cx - radius).floor() as i64, (cx + radius).ceil() as i64);
    let (y_min, y_max) = ((cy - radius).floor() as i64, (cy + radius).ceil() as i64);

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            let d2 = dx * dx + dy * dy;
            if d2 <= inner {
                put(layer, x, y, fill);
            } else if d2 <= outer {
                put(layer, x, y, outline);
            }
        }
    }
}

/// Source-over composite of `src` onto `dst`.
fn alpha_blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 || dst[3] == 0 {
        return src;
    }
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }
    let inv = 1.0 / out_a;
    let mix = |s: u8, d: u8| {
        ((s as f32 * sa + d as f32 * da * (1.0 - sa)) * inv)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgba([
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
