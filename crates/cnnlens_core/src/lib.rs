//! # cnnlens_core
//!
//! Core types and traits for cnnlens, a toolkit for inspecting trained
//! convolutional image classifiers.
//!
//! This crate provides:
//! - [`Normalization`] for per-channel normalization and its inverse
//! - [`HwcImage`] for displayable host-side images
//! - [`ImageBatch`] and [`ImageShape`] for batched image tensors
//! - [`ImageClassifier`], [`CamTarget`] and [`DescribeLayers`] model traits
//! - [`LayerSpec`] descriptions used by architecture summaries
//! - Error types and common utilities
//!
//! ## Shape Convention
//!
//! Image tensors follow `(N, C, H, W)`; a single image is `(C, H, W)`, and
//! displayable images are `(H, W, C)`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod image;
mod layer;
mod model_trait;
mod normalize;
mod shape;
mod tensor;

pub use error::{CoreError, Result};
pub use image::HwcImage;
pub use layer::{LayerDescriptor, LayerSpec};
pub use model_trait::{CamTarget, DescribeLayers, ImageClassifier, TargetLayer};
pub use normalize::Normalization;
pub use shape::ImageShape;
pub use tensor::{float_tensor_to_vec, int_tensor_to_indices, ImageBatch};

/// Backend type aliases for convenience
pub mod backend {
    #[cfg(feature = "backend-ndarray")]
    pub use burn_ndarray::NdArray;
}
