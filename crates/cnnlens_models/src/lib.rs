//! # cnnlens_models
//!
//! Reference image classifier for cnnlens.
//!
//! - [`CifarNet`] - four conv blocks, global average pooling and a linear head.
//!   Each block can be selected as a Grad-CAM target.
//! - [`save_model`] / [`load_model`] - weight checkpoints via burn's
//!   `NamedMpkFileRecorder`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod cifar_net;
pub mod error;

pub use checkpoint::{
    load_checkpoint, load_model, save_checkpoint, save_model, CheckpointMetadata,
};
pub use cifar_net::{CifarNet, CifarNetConfig, ConvBlock};
pub use error::{ModelError, Result};
