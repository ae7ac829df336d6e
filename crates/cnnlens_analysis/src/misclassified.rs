//! Misclassified example search.

use burn::prelude::*;
use tracing::{debug, info};

use cnnlens_core::{int_tensor_to_indices, HwcImage, ImageClassifier, Normalization};
use cnnlens_data::ImageDataLoader;

use crate::error::{AnalysisError, Result};

/// Examples the model got wrong, in loader order.
///
/// The three lists are parallel: `examples[i]` was predicted as
/// `predictions[i]` while its label is `labels[i]`, and the two always differ.
#[derive(Debug, Clone)]
pub struct IncorrectPredictions<B: Backend> {
    /// Input images (C, H, W), as the loader produced them.
    pub examples: Vec<Tensor<B, 3>>,
    /// Predicted class indices.
    pub predictions: Vec<usize>,
    /// Ground-truth class indices.
    pub labels: Vec<usize>,
}

impl<B: Backend> Default for IncorrectPredictions<B> {
    fn default() -> Self {
        Self {
            examples: Vec::new(),
            predictions: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl<B: Backend> IncorrectPredictions<B> {
    /// Number of misclassified examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether no example was misclassified.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    fn push(&mut self, example: Tensor<B, 3>, prediction: usize, label: usize) {
        self.examples.push(example);
        self.predictions.push(prediction);
        self.labels.push(label);
    }

    /// Keep only the first `count` examples.
    ///
    /// Fails with [`AnalysisError::NotEnoughMisclassified`] if fewer exist.
    pub fn take(mut self, count: usize) -> Result<Self> {
        if count > self.len() {
            return Err(AnalysisError::NotEnoughMisclassified {
                requested: count,
                found: self.len(),
            });
        }
        self.examples.truncate(count);
        self.predictions.truncate(count);
        self.labels.truncate(count);
        Ok(self)
    }

    /// `"{predicted}/{actual}"` caption for each example.
    ///
    /// Indices without a name fall back to the number itself.
    pub fn captions(&self, class_names: &[String]) -> Vec<String> {
        let name = |i: usize| {
            class_names
                .get(i)
                .cloned()
                .unwrap_or_else(|| i.to_string())
        };
        self.predictions
            .iter()
            .zip(&self.labels)
            .map(|(&p, &l)| format!("{}/{}", name(p), name(l)))
            .collect()
    }
}

/// Run the model over every batch and collect the examples it misclassifies.
///
/// The model should be in evaluation form (a non-autodiff backend, e.g. the
/// result of `AutodiffModule::valid`) so that batch statistics are not used.
pub fn find_incorrect_predictions<B, M>(
    model: &M,
    loader: &ImageDataLoader,
    device: &B::Device,
) -> Result<IncorrectPredictions<B>>
where
    B: Backend,
    M: ImageClassifier<B>,
{
    let mut incorrect = IncorrectPredictions::default();
    let mut seen = 0usize;

    for (batch_idx, batch) in loader.iter::<B>(device).enumerate() {
        let batch = batch?;
        let n = batch.batch_size();
        let labels = batch.target_indices()?;

        let logits = model.forward(batch.images.clone());
        let preds = int_tensor_to_indices(logits.argmax(1).reshape([n]))?;

        for (i, (&pred, &label)) in preds.iter().zip(&labels).enumerate() {
            if pred != label {
                let example = batch.images.clone().slice([i..i + 1]).squeeze::<3>(0);
                incorrect.push(example, pred, label);
            }
        }

        seen += n;
        debug!(batch = batch_idx, seen, misclassified = incorrect.len(), "scanned batch");
    }

    info!(total = seen, misclassified = incorrect.len(), "incorrect prediction search done");
    Ok(incorrect)
}

/// The first `count` misclassified images, denormalized and in HWC layout.
///
/// Fails with [`AnalysisError::NotEnoughMisclassified`] when `count` exceeds
/// the number found.
pub fn misclassified_images<B, M>(
    model: &M,
    loader: &ImageDataLoader,
    device: &B::Device,
    count: usize,
    normalization: &Normalization,
) -> Result<Vec<HwcImage>>
where
    B: Backend,
    M: ImageClassifier<B>,
{
    let incorrect = find_incorrect_predictions(model, loader, device)?.take(count)?;

    incorrect
        .examples
        .into_iter()
        .map(|example| {
            let image = normalization.denormalize(example)?;
            Ok(HwcImage::from_chw_tensor(image)?)
        })
        .collect()
}
