//! Per-channel mean/std normalization and its inverse.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::tensor::ImageBatch;

/// Per-channel normalization statistics for RGB images.
///
/// `normalize` maps a pixel `x` of channel `c` to `(x - mean[c]) / std[c]`;
/// `denormalize` maps it back with `x * std[c] + mean[c]`, which is the same as
/// first scaling by `std` and then shifting by `mean`.
///
/// # Example
///
/// ```rust
/// use cnnlens_core::Normalization;
///
/// let norm = Normalization::CIFAR10;
/// let x = 0.5_f32;
/// let back = norm.denormalize_value(0, norm.normalize_value(0, x));
/// assert!((back - x).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    /// Channel means.
    pub mean: [f32; 3],
    /// Channel standard deviations.
    pub std: [f32; 3],
}

impl Normalization {
    /// CIFAR-10 training-set statistics.
    pub const CIFAR10: Self = Self {
        mean: [0.491_399_68, 0.482_158_41, 0.446_530_91],
        std: [0.247_032_23, 0.243_485_13, 0.261_587_84],
    };

    /// Statistics that leave pixel values unchanged.
    pub const IDENTITY: Self = Self {
        mean: [0.0; 3],
        std: [1.0; 3],
    };

    /// Create normalization statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if any standard deviation is not strictly positive
    /// or any value is not finite.
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Result<Self> {
        if mean.iter().chain(&std).any(|v| !v.is_finite()) {
            return Err(CoreError::InvalidNormalization(
                "statistics must be finite".to_string(),
            ));
        }
        if let Some(s) = std.iter().find(|s| **s <= 0.0) {
            return Err(CoreError::InvalidNormalization(format!(
                "standard deviation must be positive, got {s}"
            )));
        }
        Ok(Self { mean, std })
    }

    /// Normalize a single value of channel `c`.
    #[must_use]
    pub fn normalize_value(&self, c: usize, x: f32) -> f32 {
        (x - self.mean[c]) / self.std[c]
    }

    /// Undo normalization of a single value of channel `c`.
    #[must_use]
    pub fn denormalize_value(&self, c: usize, x: f32) -> f32 {
        x * self.std[c] + self.mean[c]
    }

    /// Normalize a CHW image.
    pub fn normalize<B: Backend>(&self, image: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let (mean, std) = self.stats_3d(&image)?;
        Ok((image - mean) / std)
    }

    /// Undo normalization of a CHW image.
    pub fn denormalize<B: Backend>(&self, image: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let (mean, std) = self.stats_3d(&image)?;
        Ok(image * std + mean)
    }

    /// Normalize an NCHW batch.
    pub fn normalize_batch<B: Backend>(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        let (mean, std) = self.stats_4d(&images)?;
        Ok((images - mean) / std)
    }

    /// Undo normalization of an NCHW batch.
    pub fn denormalize_batch<B: Backend>(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 4>> {
        let (mean, std) = self.stats_4d(&images)?;
        Ok(images * std + mean)
    }

    fn stats_3d<B: Backend>(&self, image: &Tensor<B, 3>) -> Result<(Tensor<B, 3>, Tensor<B, 3>)> {
        check_channels(image.dims()[0])?;
        let device = image.device();
        let mean = Tensor::<B, 1>::from_floats(self.mean, &device).reshape([3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(self.std, &device).reshape([3, 1, 1]);
        Ok((mean, std))
    }

    fn stats_4d<B: Backend>(&self, images: &Tensor<B, 4>) -> Result<(Tensor<B, 4>, Tensor<B, 4>)> {
        check_channels(images.dims()[1])?;
        let device = images.device();
        let mean = Tensor::<B, 1>::from_floats(self.mean, &device).reshape([1, 3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(self.std, &device).reshape([1, 3, 1, 1]);
        Ok((mean, std))
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::CIFAR10
    }
}

fn check_channels(got: usize) -> Result<()> {
    if got != 3 {
        return Err(CoreError::ChannelMismatch { expected: 3, got });
    }
    Ok(())
}

impl<B: Backend> ImageBatch<B> {
    /// Normalize the batch images in place of the raw ones.
    pub fn normalized(self, normalization: &Normalization) -> Result<Self> {
        Ok(Self {
            images: normalization.normalize_batch(self.images)?,
            targets: self.targets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::float_tensor_to_vec;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn sample_image(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 3> {
        let data: Vec<f32> = (0..48).map(|i| (i as f32 * 0.37).sin()).collect();
        Tensor::<TestBackend, 1>::from_floats(data.as_slice(), device).reshape([3, 4, 4])
    }

    #[test]
    fn test_denormalize_then_normalize_roundtrips() {
        let device = Default::default();
        let image = sample_image(&device);
        let norm = Normalization::CIFAR10;

        let restored = norm
            .normalize(norm.denormalize(image.clone()).unwrap())
            .unwrap();

        let before = float_tensor_to_vec(image);
        let after = float_tensor_to_vec(restored);
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn test_denormalize_matches_scale_then_shift() {
        let device = Default::default();
        let image = Tensor::<TestBackend, 3>::ones([3, 2, 2], &device);
        let norm = Normalization::CIFAR10;

        let values = float_tensor_to_vec(norm.denormalize(image).unwrap());
        for c in 0..3 {
            let expected = norm.std[c] + norm.mean[c];
            for v in &values[c * 4..(c + 1) * 4] {
                assert!((v - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_batch_roundtrip() {
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::ones([2, 3, 2, 2], &device) * 0.25;
        let norm = Normalization::CIFAR10;

        let restored = norm
            .denormalize_batch(norm.normalize_batch(images).unwrap())
            .unwrap();
        for v in float_tensor_to_vec(restored) {
            assert!((v - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_wrong_channel_count() {
        let device = Default::default();
        let gray = Tensor::<TestBackend, 3>::zeros([1, 4, 4], &device);
        let err = Normalization::CIFAR10.denormalize(gray).unwrap_err();
        assert!(matches!(err, CoreError::ChannelMismatch { expected: 3, got: 1 }));
    }

    #[test]
    fn test_new_rejects_zero_std() {
        assert!(Normalization::new([0.5; 3], [0.2, 0.0, 0.2]).is_err());
        assert!(Normalization::new([0.5; 3], [0.2; 3]).is_ok());
    }

    #[test]
    fn test_identity_is_noop() {
        let norm = Normalization::IDENTITY;
        assert_eq!(norm.normalize_value(1, 0.3), 0.3);
        assert_eq!(norm.denormalize_value(2, 0.7), 0.7);
    }
}
