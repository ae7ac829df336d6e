//! # cnnlens_explain
//!
//! Explainability tools for cnnlens.
//!
//! This crate provides:
//! - [`GradCam`] over a chosen conv block, with optional augmentation and
//!   eigen smoothing
//! - [`CamMap`] saliency maps and the weighting/projection steps behind them
//! - [`show_cam_on_image`] JET heatmap overlays
//! - [`grad_cam_images`] for misclassified examples

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod cam;
mod capture;
mod error;
mod gradcam;
mod overlay;
mod pipeline;

pub use cam::{channel_sum_cam, principal_projection_cam, weighted_activations, CamMap};
pub use capture::LayerCapture;
pub use error::{ExplainError, Result};
pub use gradcam::{GradCam, GradCamConfig, AUG_FACTORS};
pub use overlay::{jet, show_cam_on_image};
pub use pipeline::{grad_cam_images, grad_cam_overlays};
