//! Activation and gradient capture at a target block.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use cnnlens_core::{int_tensor_to_indices, CamTarget, TargetLayer};

use crate::error::{ExplainError, Result};

/// Activations of a target block and the gradients of the class scores with
/// respect to them.
#[derive(Debug, Clone)]
pub struct LayerCapture<B: Backend> {
    /// Block output, `(batch, channels, height, width)`.
    pub activations: Tensor<B, 4>,
    /// Gradient of each image's target logit, same shape as `activations`.
    pub gradients: Tensor<B, 4>,
    /// Class whose logit was differentiated, per image.
    pub targets: Vec<usize>,
}

/// Run `input` through the evaluation copy up to `layer`, then through the
/// autodiff model's head, and backpropagate the target logits.
///
/// With `target = None` each image uses its predicted class.
pub(crate) fn capture_layer<B, M>(
    model: &M,
    eval_model: &M::InnerModule,
    layer: TargetLayer,
    input: Tensor<B::InnerBackend, 4>,
    target: Option<usize>,
) -> Result<LayerCapture<B::InnerBackend>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + CamTarget<B>,
    M::InnerModule: CamTarget<B::InnerBackend>,
{
    let activations = eval_model.features(input, layer);
    let tracked = Tensor::<B, 4>::from_inner(activations.clone()).require_grad();
    let logits = model.head(tracked.clone(), layer);
    let [batch, n_classes] = logits.dims();

    let targets = match target {
        Some(t) if t >= n_classes => {
            return Err(ExplainError::InvalidTarget {
                target: t,
                n_classes,
            })
        }
        Some(t) => vec![t; batch],
        None => int_tensor_to_indices(logits.clone().inner().argmax(1).reshape([batch]))?,
    };

    let mut mask = vec![0.0f32; batch * n_classes];
    for (i, &t) in targets.iter().enumerate() {
        mask[i * n_classes + t] = 1.0;
    }
    let mask = Tensor::<B, 2>::from_data(TensorData::new(mask, [batch, n_classes]), &logits.device());

    let grads = (logits * mask).sum().backward();
    let gradients = tracked.grad(&grads).ok_or(ExplainError::MissingGradient)?;

    Ok(LayerCapture {
        activations,
        gradients,
        targets,
    })
}
