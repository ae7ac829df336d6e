//! Saving and loading model weights with burn's record system.
//!
//! Weights are written as named MessagePack (`*.mpk`). The architecture is
//! described by a JSON sidecar holding the [`CifarNetConfig`], so a
//! checkpoint can be restored without knowing its widths up front.
//!
//! # Example
//!
//! ```rust,ignore
//! use cnnlens_models::{save_model, load_model, CifarNetConfig};
//!
//! let config = CifarNetConfig::new(10);
//! let model = config.init::<NdArray>(&device);
//! save_model(&model, "cifar.mpk")?;
//!
//! let restored = load_model(config.init::<NdArray>(&device), "cifar.mpk", &device)?;
//! ```

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use serde::{Deserialize, Serialize};

use crate::cifar_net::{CifarNet, CifarNetConfig};
use crate::error::{ModelError, Result};

/// Save a model's weights to `path`.
pub fn save_model<B, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(model.clone().into_record(), path.to_path_buf())
        .map_err(|e| ModelError::Save(e.to_string()))?;

    tracing::debug!(path = %path.display(), "saved model weights");
    Ok(())
}

/// Load weights from `path` into `model`.
pub fn load_model<B, M>(model: M, path: impl AsRef<Path>, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.to_path_buf(), device)
        .map_err(|e| ModelError::Load(e.to_string()))?;

    tracing::debug!(path = %path.display(), "loaded model weights");
    Ok(model.load_record(record))
}

/// Architecture and provenance stored next to a weights file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Configuration the weights were trained with.
    pub config: CifarNetConfig,
    /// Training epoch, if known.
    pub epoch: Option<usize>,
    /// Test accuracy at save time, if known.
    pub test_acc: Option<f32>,
}

impl CheckpointMetadata {
    /// Create metadata for a configuration.
    pub fn new(config: CifarNetConfig) -> Self {
        Self {
            config,
            epoch: None,
            test_acc: None,
        }
    }

    /// Set the training epoch.
    #[must_use]
    pub fn with_epoch(mut self, epoch: usize) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Set the test accuracy.
    #[must_use]
    pub fn with_test_acc(mut self, acc: f32) -> Self {
        self.test_acc = Some(acc);
        self
    }

    /// Path of the metadata sidecar for a weights file.
    pub fn sidecar_path(weights: impl AsRef<Path>) -> PathBuf {
        weights.as_ref().with_extension("json")
    }

    /// Save metadata to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::Save(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| ModelError::Load(e.to_string()))
    }
}

/// Save a [`CifarNet`] with its metadata sidecar.
pub fn save_checkpoint<B: Backend>(
    model: &CifarNet<B>,
    metadata: &CheckpointMetadata,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    save_model(model, path)?;
    metadata.save(CheckpointMetadata::sidecar_path(path))
}

/// Restore a [`CifarNet`] from weights and their metadata sidecar.
pub fn load_checkpoint<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(CifarNet<B>, CheckpointMetadata)> {
    let path = path.as_ref();
    let metadata = CheckpointMetadata::load(CheckpointMetadata::sidecar_path(path))?;
    let model = load_model(metadata.config.init::<B>(device), path, device)?;
    Ok((model, metadata))
}
