//! Pyramid level metadata and axis semantics.

use std::fmt;
use std::ops::Range;

use crate::error::LayoutError;
use crate::format::DataType;

/// Width and height of one pyramid level, in that level's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageExtent {
    pub width: u64,
    pub height: u64,
}

impl ImageExtent {
    pub const fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ImageExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// =============================================================================
// AxisLayout
// =============================================================================

/// How the raw axes of a level map onto (channel, Y, X).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLayout {
    /// `(Y, X)`
    Planar2D,

    /// `(C, Y, X)` with at most 4 channels
    ChannelFirst3D,

    /// `(Y, X, C)`
    ChannelLast3D,

    /// `(T, C, Y, X)`; time index 0 is displayed
    TimeChannel4D,

    /// `(T, C, Z, Y, X)`; time and z index 0 are displayed
    TimeChannel5D,
}

impl AxisLayout {
    /// Classify a level by its raw shape.
    pub fn from_shape(level: usize, shape: &[u64]) -> Result<Self, LayoutError> {
        match shape.len() {
            2 => Ok(AxisLayout::Planar2D),
            3 if shape[0] <= 4 => Ok(AxisLayout::ChannelFirst3D),
            3 => Ok(AxisLayout::ChannelLast3D),
            4 => Ok(AxisLayout::TimeChannel4D),
            5 => Ok(AxisLayout::TimeChannel5D),
            rank => Err(LayoutError::UnsupportedRank { level, rank }),
        }
    }

    /// Raw axis indices of (Y, X).
    pub const fn spatial_axes(&self) -> (usize, usize) {
        match self {
            AxisLayout::Planar2D => (0, 1),
            AxisLayout::ChannelFirst3D => (1, 2),
            AxisLayout::ChannelLast3D => (0, 1),
            AxisLayout::TimeChannel4D => (2, 3),
            AxisLayout::TimeChannel5D => (3, 4),
        }
    }

    /// Raw axis index of the channel axis, if any.
    pub const fn channel_axis(&self) -> Option<usize> {
        match self {
            AxisLayout::Planar2D => None,
            AxisLayout::ChannelFirst3D => Some(0),
            AxisLayout::ChannelLast3D => Some(2),
            AxisLayout::TimeChannel4D | AxisLayout::TimeChannel5D => Some(1),
        }
    }

    /// Whether channels follow the spatial axes in a [`RawRegion`](super::RawRegion).
    pub const fn is_channel_last(&self) -> bool {
        matches!(self, AxisLayout::ChannelLast3D)
    }

    /// Raw index ranges selecting `rows × cols` of the displayed plane.
    ///
    /// Time and z axes are pinned to index 0; the channel axis is read whole.
    pub fn selection(&self, shape: &[u64], rows: Range<u64>, cols: Range<u64>) -> Vec<Range<u64>> {
        let mut ranges: Vec<Range<u64>> = shape.iter().map(|_| 0..1).collect();
        let (y, x) = self.spatial_axes();
        ranges[y] = rows;
        ranges[x] = cols;
        if let Some(c) = self.channel_axis() {
            ranges[c] = 0..shape[c];
        }
        ranges
    }

    pub const fn name(&self) -> &'static str {
        match self {
            AxisLayout::Planar2D => "planar-2D",
            AxisLayout::ChannelFirst3D => "channel-first-3D",
            AxisLayout::ChannelLast3D => "channel-last-3D",
            AxisLayout::TimeChannel4D => "time-channel-4D",
            AxisLayout::TimeChannel5D => "time-channel-5D",
        }
    }
}

impl fmt::Display for AxisLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PyramidLevel
// =============================================================================

/// Immutable description of one resolution level.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidLevel {
    /// 0 is full resolution
    pub index: usize,

    /// Store path of the level's array, relative to the pyramid root
    pub path: String,

    /// Raw axis lengths
    pub shape: Vec<u64>,

    pub layout: AxisLayout,

    pub dtype: DataType,
}

impl PyramidLevel {
    /// Displayed plane size.
    pub fn extent(&self) -> ImageExtent {
        let (y, x) = self.layout.spatial_axes();
        ImageExtent::new(self.shape[x], self.shape[y])
    }

    /// Number of source channels (1 for planar data).
    pub fn channels(&self) -> usize {
        self.layout
            .channel_axis()
            .map_or(1, |c| self.shape[c] as usize)
    }
}
