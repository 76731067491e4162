use std::fmt;
use std::ops::Deref;

use crate::error::OcrError;

/// Immutable view over an 8-bit grayscale plane.
#[derive(Clone)]
pub struct LumaPlane<'a> {
    width: u32,
    height: u32,
    stride: usize,
    data: &'a [u8],
}

impl<'a> LumaPlane<'a> {
    pub fn from_parts(
        width: u32,
        height: u32,
        stride: usize,
        data: &'a [u8],
    ) -> Result<Self, OcrError> {
        let required = stride
            .checked_mul(height as usize)
            .ok_or(OcrError::PlaneOverflow { stride, height })?;
        if data.len() < required {
            return Err(OcrError::InsufficientPlaneData {
                provided: data.len(),
                required,
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            data: &data[..required],
        })
    }

    /// Tightly packed plane where `stride == width`.
    pub fn packed(width: u32, height: u32, data: &'a [u8]) -> Result<Self, OcrError> {
        Self::from_parts(width, height, width as usize, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Visible pixels of row `y`, without stride padding.
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        let end = start + (self.width as usize).min(self.stride);
        &self.data[start..end]
    }
}

impl fmt::Debug for LumaPlane<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LumaPlane")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Deref for LumaPlane<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}
