//! Gradient-weighted class activation mapping.

use std::marker::PhantomData;

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cnnlens_core::{CamTarget, TargetLayer};

use crate::cam::{channel_sum_cam, principal_projection_cam, weighted_activations, CamMap};
use crate::capture::{capture_layer, LayerCapture};
use crate::error::Result;

/// Intensity factors used by augmentation smoothing.
pub const AUG_FACTORS: [f32; 3] = [0.9, 1.0, 1.1];

/// Grad-CAM options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradCamConfig {
    /// Average maps over horizontal flips and intensity factors.
    pub aug_smooth: bool,
    /// Use the first principal component of the weighted activations instead
    /// of their channel sum.
    pub eigen_smooth: bool,
}

impl GradCamConfig {
    /// Both smoothing options enabled.
    #[must_use]
    pub fn smoothed() -> Self {
        Self {
            aug_smooth: true,
            eigen_smooth: true,
        }
    }
}

/// Grad-CAM over one conv block of an autodiff model.
///
/// Activations come from the model's evaluation copy (`valid()`); gradients
/// flow through the autodiff model's head.
///
/// # Example
///
/// ```rust,ignore
/// let cam = GradCam::new(&model, TargetLayer::Block4, GradCamConfig::smoothed());
/// let maps = cam.compute(images, None)?; // one map per image, sized like the input
/// ```
pub struct GradCam<'a, B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    model: &'a M,
    eval_model: M::InnerModule,
    layer: TargetLayer,
    config: GradCamConfig,
    _backend: PhantomData<B>,
}

impl<'a, B, M> GradCam<'a, B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + CamTarget<B>,
    M::InnerModule: CamTarget<B::InnerBackend>,
{
    /// Create a Grad-CAM for `layer`.
    pub fn new(model: &'a M, layer: TargetLayer, config: GradCamConfig) -> Self {
        Self {
            model,
            eval_model: model.clone().valid(),
            layer,
            config,
            _backend: PhantomData,
        }
    }

    /// Target block.
    pub fn layer(&self) -> TargetLayer {
        self.layer
    }

    /// Options in use.
    pub fn config(&self) -> GradCamConfig {
        self.config
    }

    /// Activations and gradients at the target block for `input`.
    pub fn capture(
        &self,
        input: Tensor<B::InnerBackend, 4>,
        target: Option<usize>,
    ) -> Result<LayerCapture<B::InnerBackend>> {
        capture_layer::<B, M>(self.model, &self.eval_model, self.layer, input, target)
    }

    /// One map per image in `input` `(batch, channels, height, width)`, each
    /// `height × width` with values in [0, 1].
    ///
    /// `target = None` explains each image's predicted class.
    pub fn compute(
        &self,
        input: Tensor<B::InnerBackend, 4>,
        target: Option<usize>,
    ) -> Result<Vec<CamMap>> {
        if !self.config.aug_smooth {
            return self.single_pass(input, target);
        }

        let batch = input.dims()[0];
        let mut per_image: Vec<Vec<CamMap>> = vec![Vec::new(); batch];
        for flip in [false, true] {
            for factor in AUG_FACTORS {
                let mut x = input.clone();
                if flip {
                    x = x.flip([3]);
                }
                if factor != 1.0 {
                    x = x * factor;
                }

                let maps = self.single_pass(x, target)?;
                for (acc, map) in per_image.iter_mut().zip(maps) {
                    acc.push(if flip { map.flip_horizontal() } else { map });
                }
                debug!(flip, factor, "augmented grad-cam pass");
            }
        }

        per_image.iter().map(|maps| CamMap::mean(maps)).collect()
    }

    fn single_pass(
        &self,
        input: Tensor<B::InnerBackend, 4>,
        target: Option<usize>,
    ) -> Result<Vec<CamMap>> {
        let [_, _, height, width] = input.dims();
        let capture = self.capture(input, target)?;
        debug!(layer = self.layer.block_name(), targets = ?capture.targets, "captured activations");

        let weighted = weighted_activations(capture.activations, capture.gradients);
        let maps = if self.config.eigen_smooth {
            principal_projection_cam(weighted)?
        } else {
            channel_sum_cam(weighted)?
        };

        Ok(maps
            .into_iter()
            .map(|map| map.relu().normalize().resize(height, width).normalize())
            .collect())
    }
}
