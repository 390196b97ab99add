// Owned RGBA frame. One per tick; the detector keeps at most one previous frame.

use crate::error::DetectorError;
use crate::types::FrameDimensions;

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Row-major RGBA pixels tagged with their size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    dimensions: FrameDimensions,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    /// Wrap raw RGBA bytes. The length must be exactly `width * height * 4`.
    pub fn new(dimensions: FrameDimensions, pixels: Vec<u8>) -> Result<Self, DetectorError> {
        let expected = byte_len(dimensions)?;
        if pixels.len() != expected {
            return Err(DetectorError::FrameSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(FrameBuffer { dimensions, pixels })
    }

    /// A frame where every pixel has the same color.
    pub fn filled(dimensions: FrameDimensions, rgba: [u8; 4]) -> Result<Self, DetectorError> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(byte_len(dimensions)?)
            .collect();
        Ok(FrameBuffer { dimensions, pixels })
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Byte offset of pixel (x, y). Caller keeps (x, y) in bounds.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.dimensions.width as usize + x as usize) * CHANNELS
    }

    /// RGB of pixel (x, y).
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Paint a rectangle, clipped to the frame. Handy for synthetic frames.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgba: [u8; 4]) {
        let x_end = x.saturating_add(width).min(self.width());
        let y_end = y.saturating_add(height).min(self.height());
        for py in y..y_end {
            for px in x..x_end {
                let i = self.offset(px, py);
                self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
            }
        }
    }
}

fn byte_len(dimensions: FrameDimensions) -> Result<usize, DetectorError> {
    dimensions
        .rgba_len()
        .ok_or(DetectorError::FrameTooLarge {
            width: dimensions.width,
            height: dimensions.height,
        })
}
