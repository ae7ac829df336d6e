//! Error types for cnnlens_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur in cnnlens_core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid tensor shape provided.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// The tensor's channel count does not match the normalization statistics.
    #[error("Channel mismatch: normalization has {expected} channels, tensor has {got}")]
    ChannelMismatch {
        /// Channels described by the normalization.
        expected: usize,
        /// Channels found on the tensor.
        got: usize,
    },

    /// Normalization statistics are unusable.
    #[error("Invalid normalization: {0}")]
    InvalidNormalization(String),

    /// Grad-CAM target layer index outside 1..=4.
    #[error("Invalid target layer {0}: expected a value in 1..=4")]
    InvalidTargetLayer(usize),

    /// Tensor data could not be read back into host memory.
    #[error("Tensor data error: {0}")]
    TensorData(String),

    /// Transform error.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
