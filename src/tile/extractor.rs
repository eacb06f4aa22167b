//! Region extraction into display frames.
//!
//! # Pipeline
//!
//! 1. Read the rectangle through [`PyramidSource::read_region`], which pads
//!    anything outside the level with zeros
//! 2. Move channels last, whatever the level's axis layout
//! 3. Normalize the channel count: 1 or 2 channels show channel 0 as gray
//!    RGB, 3 or 4 are kept, more than 4 keep the first three
//! 4. Rescale non-8-bit samples by the maximum of this read (per tile)

use tracing::debug;

use crate::error::ExtractError;
use crate::format::SampleBuffer;
use crate::pyramid::{AxisLayout, PyramidSource, RawRegion};

use super::frame::Frame;

/// Converts raw level samples into [`Frame`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionExtractor;

impl RegionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract a `height × width` frame whose top-left corner is (`y`, `x`)
    /// in `level` pixel coordinates.
    ///
    /// Coordinates may be negative or run past the level edge; the uncovered
    /// part of the frame is black.
    pub fn extract(
        &self,
        source: &PyramidSource,
        level: usize,
        y: i64,
        x: i64,
        height: usize,
        width: usize,
    ) -> Result<Frame, ExtractError> {
        let region = source.read_region(level, y, x, height, width)?;

        let (h, w, channels) = region.hwc();
        if h != height || w != width || channels == 0 {
            return Err(ExtractError::UnexpectedShape {
                level,
                dims: region.dims.clone(),
            });
        }

        let scale = match &region.samples {
            SampleBuffer::U8(_) => None,
            SampleBuffer::Wide(_) => Some(region.samples.max().unwrap_or(0.0)),
        };

        debug!(level, y, x, height, width, channels, ?scale, "extracted region");

        let out_channels = if channels == 4 { 4 } else { 3 };
        let data = to_display_bytes(&region, out_channels, scale);

        // Channel count is 3 or 4 and the length matches by construction
        Frame::new(height, width, out_channels, data).map_err(|_| ExtractError::UnexpectedShape {
            level,
            dims: region.dims,
        })
    }
}

/// Map one sample to a display byte, given the per-tile maximum for wide data.
fn to_byte(value: f64, max: f64) -> u8 {
    if value.is_nan() || value <= 0.0 || max <= 0.0 {
        return 0;
    }
    (value / max * 255.0).clamp(0.0, 255.0) as u8
}

fn to_display_bytes(region: &RawRegion, out_channels: usize, scale: Option<f64>) -> Vec<u8> {
    let (h, w, channels) = region.hwc();

    // Interleaved RGB/RGBA bytes can be taken as they are
    if let (SampleBuffer::U8(bytes), true) = (
        &region.samples,
        region.layout == AxisLayout::ChannelLast3D && channels == out_channels,
    ) {
        return bytes.clone();
    }

    // Source channel for each output channel
    let map: Vec<usize> = match channels {
        1 | 2 => vec![0, 0, 0],
        3 => vec![0, 1, 2],
        4 => vec![0, 1, 2, 3],
        _ => vec![0, 1, 2],
    };

    let mut out = Vec::with_capacity(h * w * out_channels);
    for y in 0..h {
        for x in 0..w {
            for &c in &map {
                let v = region.sample(y, x, c);
                out.push(match scale {
                    None => v as u8,
                    Some(max) => to_byte(v, max),
                });
            }
        }
    }
    out
}
