//! Model traits the inspection helpers are written against.
//!
//! The helpers never construct models; they take any classifier that
//! implements these traits.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::layer::LayerDescriptor;

/// An image classifier producing one logit per class.
pub trait ImageClassifier<B: Backend> {
    /// Forward pass returning logits.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape (batch, channels, height, width)
    ///
    /// # Returns
    ///
    /// Logits tensor of shape (batch, n_classes)
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Forward pass returning probabilities.
    fn forward_probs(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes.
    fn n_classes(&self) -> usize;
}

/// One of the four convolutional blocks Grad-CAM can target.
///
/// Indices count from the output side: `1` is the deepest block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TargetLayer {
    /// `convblock1`, closest to the input (index 4).
    Block1,
    /// `convblock2` (index 3).
    Block2,
    /// `convblock3` (index 2).
    Block3,
    /// `convblock4`, closest to the classifier (index 1).
    #[default]
    Block4,
}

impl TargetLayer {
    /// Map a layer index in `1..=4` to its block.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTargetLayer`] for any other index.
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            1 => Ok(Self::Block4),
            2 => Ok(Self::Block3),
            3 => Ok(Self::Block2),
            4 => Ok(Self::Block1),
            other => Err(CoreError::InvalidTargetLayer(other)),
        }
    }

    /// The inverse of [`TargetLayer::from_index`].
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Block4 => 1,
            Self::Block3 => 2,
            Self::Block2 => 3,
            Self::Block1 => 4,
        }
    }

    /// Zero-based position of the block from the input side.
    #[must_use]
    pub const fn block_position(&self) -> usize {
        4 - self.index()
    }

    /// Block name as used in layer paths.
    #[must_use]
    pub const fn block_name(&self) -> &'static str {
        match self {
            Self::Block1 => "convblock1",
            Self::Block2 => "convblock2",
            Self::Block3 => "convblock3",
            Self::Block4 => "convblock4",
        }
    }
}

/// A classifier that can be split at a convolutional block for Grad-CAM.
///
/// `head` always runs in evaluation form: batch norm uses its running
/// statistics and dropout is off, on any backend. Fed the features of the
/// evaluation copy (`valid()`), `head(features(x, l), l)` equals that copy's
/// `forward(x)`.
pub trait CamTarget<B: Backend>: ImageClassifier<B> {
    /// Activations of the target block, shape (batch, channels, h, w).
    fn features(&self, x: Tensor<B, 4>, layer: TargetLayer) -> Tensor<B, 4>;

    /// The remainder of the network from the target block's output to logits.
    fn head(&self, activations: Tensor<B, 4>, layer: TargetLayer) -> Tensor<B, 2>;
}

/// A model that can list its leaf layers for summaries.
pub trait DescribeLayers {
    /// Leaf layers in execution order.
    fn layers(&self) -> Vec<LayerDescriptor>;
}
