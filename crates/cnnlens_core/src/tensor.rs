//! Image batch type and host read-back helpers.

use burn::prelude::*;

use crate::error::{CoreError, Result};
use crate::shape::ImageShape;

/// A batch of images with their class labels.
///
/// This is the unit yielded by data loaders: `images` is `(N, C, H, W)` and
/// `targets` holds one class index per image.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Input images (N, C, H, W).
    pub images: Tensor<B, 4>,
    /// Class indices (N).
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    /// Create a batch, checking that images and targets agree on N.
    pub fn new(images: Tensor<B, 4>, targets: Tensor<B, 1, Int>) -> Result<Self> {
        let [n_images, ..] = images.dims();
        let [n_targets] = targets.dims();
        if n_images != n_targets {
            return Err(CoreError::InvalidShape {
                expected: format!("{n_images} targets"),
                got: format!("{n_targets} targets"),
            });
        }
        Ok(Self { images, targets })
    }

    /// Number of images in the batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.images.dims()[0]
    }

    /// Shape of each image.
    #[must_use]
    pub fn image_shape(&self) -> ImageShape {
        let [_, c, h, w] = self.images.dims();
        ImageShape::new(c, h, w)
    }

    /// Get the device.
    pub fn device(&self) -> B::Device {
        self.images.device()
    }

    /// Move the batch to a device.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            images: self.images.to_device(device),
            targets: self.targets.to_device(device),
        }
    }

    /// Read the targets back as class indices.
    pub fn target_indices(&self) -> Result<Vec<usize>> {
        int_tensor_to_indices(self.targets.clone())
    }
}

/// Read an integer tensor back as `usize` indices.
///
/// Integer element types differ between backends (i32 on some, i64 on
/// others); values are converted element-wise. Negative values are rejected.
pub fn int_tensor_to_indices<B: Backend, const D: usize>(
    tensor: Tensor<B, D, Int>,
) -> Result<Vec<usize>> {
    tensor
        .into_data()
        .iter::<i64>()
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| CoreError::TensorData(format!("negative class index {v}")))
        })
        .collect()
}

/// Read a float tensor back as a flat `Vec<f32>` in row-major order.
pub fn float_tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}
