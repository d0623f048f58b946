//! Multi-channel 8-bit raster held as a (height, width, channel) grid.
//!
//! Channel order and color space are opaque here: every channel is an
//! independent grayscale plane as far as the operators are concerned.

use ndarray::{stack, Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{EnhanceError, Result};
use crate::histogram::Histogram;

/// An image with 1 (gray) or 3 channels and non-zero area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Array3<u8>,
}

impl Image {
    /// Wrap an existing `(height, width, channels)` array.
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = data.dim();
        if height == 0 || width == 0 {
            return Err(EnhanceError::EmptyInput("image has zero area"));
        }
        if channels != 1 && channels != 3 {
            return Err(EnhanceError::InvalidShape(format!(
                "expected 1 or 3 channels, got {}",
                channels
            )));
        }
        Ok(Self { data })
    }

    /// Build from interleaved row-major samples (`y`, then `x`, then channel).
    pub fn from_raw(width: u32, height: u32, channels: usize, samples: Vec<u8>) -> Result<Self> {
        let shape = (height as usize, width as usize, channels);
        let expected = shape.0 * shape.1 * shape.2;
        if samples.len() != expected {
            return Err(EnhanceError::InvalidShape(format!(
                "{}x{}x{} needs {} samples, got {}",
                width,
                height,
                channels,
                expected,
                samples.len()
            )));
        }
        let data = Array3::from_shape_vec(shape, samples)
            .map_err(|e| EnhanceError::InvalidShape(e.to_string()))?;
        Self::from_array(data)
    }

    /// Single-channel image from one plane.
    pub fn from_gray(plane: Array2<u8>) -> Result<Self> {
        Self::from_planes(vec![plane])
    }

    /// Reassemble channel planes, in order, into one image.
    pub fn from_planes(planes: Vec<Array2<u8>>) -> Result<Self> {
        if planes.is_empty() {
            return Err(EnhanceError::InvalidShape("no channel planes".to_string()));
        }
        let views: Vec<ArrayView2<'_, u8>> = planes.iter().map(|p| p.view()).collect();
        let data = stack(Axis(2), &views).map_err(|e| EnhanceError::InvalidShape(e.to_string()))?;
        Self::from_array(data)
    }

    /// Image with every sample set to `value`.
    pub fn filled(width: u32, height: u32, channels: usize, value: u8) -> Result<Self> {
        Self::from_array(Array3::from_elem(
            (height as usize, width as usize, channels),
            value,
        ))
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// `(height, width, channels)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn pixel_count(&self) -> usize {
        self.height() * self.width()
    }

    /// Borrow one channel as a 2-D plane.
    ///
    /// # Panics
    /// If `channel >= self.channels()`.
    pub fn channel(&self, channel: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(2), channel)
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// Per-channel histograms, in channel order.
    pub fn histograms(&self) -> Vec<Histogram> {
        (0..self.channels())
            .map(|c| Histogram::from_plane(self.channel(c)))
            .collect()
    }

    /// Interleaved row-major samples, the inverse of [`Image::from_raw`].
    pub fn to_raw(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }
}
