//! Rectangular pixel blocks exchanged with drawing contexts.

use crate::error::{Result, SurfaceError};
use crate::pixel;
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `width × height` surface.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect with `[0, width) × [0, height)`.
    pub fn clip_to(&self, width: u32, height: u32) -> Self {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Smallest region covering both. An empty side is ignored.
    pub fn union(&self, other: Region) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// A block of packed pixels (see [`pixel`]) in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl ImageData {
    /// Fully transparent block.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_packed(width: u32, height: u32, data: Vec<u32>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != width as usize * height as usize * 4 {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        Self::from_packed(width, height, pixel::pack_rgba8(bytes))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u32> {
        self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.data[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        pixel::unpack_rgba8(&self.data)
    }

    /// Copy `region` out of a packed `width`-wide buffer. The region must
    /// already be clipped to the buffer.
    pub(crate) fn copy_from(buffer: &[u32], width: u32, region: Region) -> Self {
        let mut data = Vec::with_capacity(region.width as usize * region.height as usize);
        for row in region.y..region.y + region.height {
            let start = (row * width + region.x) as usize;
            data.extend_from_slice(&buffer[start..start + region.width as usize]);
        }
        Self {
            width: region.width,
            height: region.height,
            data,
        }
    }
}
