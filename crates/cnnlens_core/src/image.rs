//! Host-side images in height × width × channels layout.

use burn::prelude::*;

use crate::error::{CoreError, Result};
use crate::tensor::float_tensor_to_vec;

/// An owned `f32` image in `(H, W, C)` order.
///
/// This is the displayable form of a CHW tensor: the same values permuted so
/// that each pixel's channels are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct HwcImage {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

impl HwcImage {
    /// Create an image from raw HWC data.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != height * width * channels`.
    pub fn new(height: usize, width: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != height * width * channels {
            return Err(CoreError::InvalidShape {
                expected: format!("{} values for ({height}, {width}, {channels})", height * width * channels),
                got: format!("{} values", data.len()),
            });
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// Permute a CHW tensor into an HWC image.
    pub fn from_chw_tensor<B: Backend>(tensor: Tensor<B, 3>) -> Result<Self> {
        let [c, h, w] = tensor.dims();
        let data = float_tensor_to_vec(tensor.permute([1, 2, 0]));
        Self::new(h, w, c, data)
    }

    /// Image height.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of channels.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw HWC values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at row `y`, column `x`, channel `c`.
    #[must_use]
    pub fn get(&self, y: usize, x: usize, c: usize) -> f32 {
        self.data[(y * self.width + x) * self.channels + c]
    }

    /// The channels of the pixel at row `y`, column `x`.
    #[must_use]
    pub fn pixel(&self, y: usize, x: usize) -> &[f32] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Largest value in the image.
    #[must_use]
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Smallest value in the image.
    #[must_use]
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Clamp negatives to zero and divide by the maximum, so the largest
    /// value becomes 1. An all-zero image is returned unchanged.
    #[must_use]
    pub fn scale_to_unit_max(&self) -> Self {
        let clamped: Vec<f32> = self.data.iter().map(|v| v.max(0.0)).collect();
        let max = clamped.iter().copied().fold(0.0_f32, f32::max);
        let data = if max > 0.0 {
            clamped.into_iter().map(|v| v / max).collect()
        } else {
            clamped
        };
        Self { data, ..*self }
    }

    /// Clamp every value into `[0, 1]`.
    #[must_use]
    pub fn clamp_unit(&self) -> Self {
        Self {
            data: self.data.iter().map(|v| v.clamp(0.0, 1.0)).collect(),
            ..*self
        }
    }
}
