//! Grad-CAM overlays for misclassified examples.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use image::RgbImage;
use tracing::info;

use cnnlens_analysis::{find_incorrect_predictions, IncorrectPredictions};
use cnnlens_core::{CamTarget, HwcImage, Normalization, TargetLayer};
use cnnlens_data::ImageDataLoader;

use crate::error::Result;
use crate::gradcam::{GradCam, GradCamConfig};
use crate::overlay::show_cam_on_image;

/// Overlay smoothed Grad-CAM maps on each example in `incorrect`.
///
/// Maps are computed on the examples as the model sees them (normalized);
/// the displayed image is denormalized and divided by its maximum.
pub fn grad_cam_overlays<B, M>(
    model: &M,
    incorrect: &IncorrectPredictions<B::InnerBackend>,
    layer: TargetLayer,
    transparency: f32,
    normalization: &Normalization,
) -> Result<Vec<RgbImage>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + CamTarget<B>,
    M::InnerModule: CamTarget<B::InnerBackend>,
{
    if incorrect.is_empty() {
        return Ok(Vec::new());
    }

    let cam = GradCam::new(model, layer, GradCamConfig::smoothed());
    let input = Tensor::stack::<4>(incorrect.examples.clone(), 0);
    let maps = cam.compute(input, None)?;

    incorrect
        .examples
        .iter()
        .zip(&maps)
        .map(|(example, map)| {
            let image = HwcImage::from_chw_tensor(normalization.denormalize(example.clone())?)?;
            show_cam_on_image(&image.scale_to_unit_max(), map, transparency)
        })
        .collect()
}

/// Grad-CAM overlays for the first `count` misclassified examples.
///
/// Fails when `count` exceeds the number of misclassified examples.
pub fn grad_cam_images<B, M>(
    model: &M,
    loader: &ImageDataLoader,
    device: &B::Device,
    count: usize,
    layer: TargetLayer,
    transparency: f32,
    normalization: &Normalization,
) -> Result<Vec<RgbImage>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + CamTarget<B>,
    M::InnerModule: CamTarget<B::InnerBackend>,
{
    let eval_model = model.clone().valid();
    let incorrect =
        find_incorrect_predictions::<B::InnerBackend, _>(&eval_model, loader, device)?.take(count)?;

    let overlays = grad_cam_overlays::<B, M>(model, &incorrect, layer, transparency, normalization)?;
    info!(count = overlays.len(), layer = layer.block_name(), "grad-cam overlays ready");
    Ok(overlays)
}
