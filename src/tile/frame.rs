//! Display frames.

use bytes::Bytes;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::error::RenderError;

/// A dense `height × width × channels` 8-bit buffer in row-major HWC order.
///
/// `channels` is 1, 3 or 4. Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    height: usize,
    width: usize,
    channels: usize,
    data: Bytes,
}

impl Frame {
    /// Wrap a pixel buffer, checking its channel count and length.
    pub fn new(
        height: usize,
        width: usize,
        channels: usize,
        data: impl Into<Bytes>,
    ) -> Result<Self, RenderError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(RenderError::UnexpectedChannels(channels));
        }
        let data = data.into();
        let expected = height * width * channels;
        if data.len() != expected {
            return Err(RenderError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Black RGB frame.
    pub fn blank(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            channels: 3,
            data: Bytes::from(vec![0u8; height * width * 3]),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The channel values of one pixel.
    pub fn pixel(&self, y: usize, x: usize) -> &[u8] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    /// RGB pixel at (`y`, `x`); gray is replicated and alpha dropped.
    pub fn rgb(&self, y: usize, x: usize) -> [u8; 3] {
        let p = self.pixel(y, x);
        match self.channels {
            1 => [p[0], p[0], p[0]],
            _ => [p[0], p[1], p[2]],
        }
    }

    /// Convert into an `image` buffer for display or encoding.
    pub fn to_image(&self) -> Result<DynamicImage, RenderError> {
        let (w, h) = (self.width as u32, self.height as u32);
        let raw = self.data.to_vec();
        let size_error = || RenderError::BufferSize {
            expected: self.height * self.width * self.channels,
            actual: self.data.len(),
        };

        match self.channels {
            1 => GrayImage::from_raw(w, h, raw)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(size_error),
            3 => RgbImage::from_raw(w, h, raw)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(size_error),
            4 => RgbaImage::from_raw(w, h, raw)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(size_error),
            n => Err(RenderError::UnexpectedChannels(n)),
        }
    }
}
