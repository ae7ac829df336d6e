//! Misclassification, Grad-CAM and sample grids.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use image::RgbImage;
use tracing::info;

use cnnlens_analysis::{find_incorrect_predictions, IncorrectPredictions};
use cnnlens_core::{CamTarget, HwcImage, ImageClassifier, Normalization};
use cnnlens_data::ImageDataLoader;
use cnnlens_explain::grad_cam_overlays;

use crate::config::PlotConfig;
use crate::error::{RenderError, Result};
use crate::figure::{hwc_to_rgb, Figure};

/// X-axis caption of the misclassification figures.
pub const MISCLASSIFIED_XLABEL: &str = "Misclassified Images";
/// Y-axis caption of the misclassification figures.
pub const MISCLASSIFIED_YLABEL: &str = "Loss";
/// Legend of the misclassification figures.
pub const MISCLASSIFIED_LEGEND: &str = "Incorrect Prediction/Actual Label";

/// Samples per row in [`sample_grid`].
pub const SAMPLES_PER_ROW: usize = 8;

fn denormalized_tile<B: Backend>(example: Tensor<B, 3>, normalization: &Normalization) -> Result<RgbImage> {
    let image = HwcImage::from_chw_tensor(normalization.denormalize(example)?)?;
    hwc_to_rgb(&image)
}

fn misclassified_figure<B: Backend>(
    incorrect: &IncorrectPredictions<B>,
    tiles: &[RgbImage],
    class_names: &[String],
    config: &PlotConfig,
) -> Result<Figure> {
    let figure = Figure::compose(
        tiles,
        incorrect.captions(class_names),
        config.rows,
        config.columns,
        config.tile_scale,
    )?;
    Ok(figure
        .with_xlabel(MISCLASSIFIED_XLABEL)
        .with_ylabel(MISCLASSIFIED_YLABEL)
        .with_legend(MISCLASSIFIED_LEGEND))
}

/// Grid of the first `rows × columns` misclassified images, each titled
/// `"{predicted}/{actual}"`.
///
/// The model should be in evaluation form. Fails when fewer misclassified
/// images exist than the grid holds.
pub fn plot_misclassified<B, M>(
    model: &M,
    loader: &ImageDataLoader,
    device: &B::Device,
    class_names: &[String],
    config: &PlotConfig,
) -> Result<Figure>
where
    B: Backend,
    M: ImageClassifier<B>,
{
    let incorrect = find_incorrect_predictions(model, loader, device)?.take(config.n_panels())?;
    let tiles = incorrect
        .examples
        .iter()
        .map(|example| denormalized_tile(example.clone(), &config.normalization))
        .collect::<Result<Vec<_>>>()?;

    let figure = misclassified_figure(&incorrect, &tiles, class_names, config)?;
    info!(panels = tiles.len(), "plotted misclassified images");
    Ok(figure)
}

/// Grid of Grad-CAM overlays on the first `rows × columns` misclassified
/// images, titled like [`plot_misclassified`].
///
/// Uses augmentation and eigen smoothing at `config.layer`, blended with
/// `config.transparency`.
pub fn plot_grad_cam<B, M>(
    model: &M,
    loader: &ImageDataLoader,
    device: &B::Device,
    class_names: &[String],
    config: &PlotConfig,
) -> Result<Figure>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + CamTarget<B>,
    M::InnerModule: CamTarget<B::InnerBackend>,
{
    let layer = config.target_layer()?;
    let eval_model = model.clone().valid();
    let incorrect = find_incorrect_predictions::<B::InnerBackend, _>(&eval_model, loader, device)?
        .take(config.n_panels())?;

    let tiles = grad_cam_overlays::<B, M>(
        model,
        &incorrect,
        layer,
        config.transparency,
        &config.normalization,
    )?;

    let figure = misclassified_figure(&incorrect, &tiles, class_names, config)?;
    info!(panels = tiles.len(), layer = layer.block_name(), "plotted grad-cam overlays");
    Ok(figure)
}

/// The first `count` images of the loader's first batch in rows of 8,
/// titled `"Label: {label}"`.
///
/// Images are shown as stored in the dataset, before loader normalization.
/// `count` must be a positive multiple of 8 no larger than the batch.
pub fn sample_grid(loader: &ImageDataLoader, count: usize, tile_scale: u32) -> Result<Figure> {
    if count == 0 || count % SAMPLES_PER_ROW != 0 {
        return Err(RenderError::InvalidSampleCount {
            count,
            reason: format!("must be a positive multiple of {SAMPLES_PER_ROW}"),
        });
    }
    let order = loader.sample_order();
    let first_batch = order.len().min(loader.batch_size());
    if count > first_batch {
        return Err(RenderError::InvalidSampleCount {
            count,
            reason: format!("first batch holds {first_batch} images"),
        });
    }

    let dataset = loader.dataset();
    let mut tiles = Vec::with_capacity(count);
    let mut titles = Vec::with_capacity(count);
    for &index in &order[..count] {
        let (chw, label) = dataset.get(index)?;
        let (channels, height, width) = chw.dim();
        let hwc: Vec<f32> = chw.permuted_axes([1, 2, 0]).iter().copied().collect();
        tiles.push(hwc_to_rgb(&HwcImage::new(height, width, channels, hwc)?)?);
        titles.push(format!("Label: {label}"));
    }

    let figure = Figure::compose(&tiles, titles, count / SAMPLES_PER_ROW, SAMPLES_PER_ROW, tile_scale)?;
    info!(count, "plotted sample grid");
    Ok(figure)
}
