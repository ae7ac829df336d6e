//! Error types for cnnlens_explain.

use thiserror::Error;

/// Result type alias using [`ExplainError`].
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Explainability errors.
#[derive(Debug, Error)]
pub enum ExplainError {
    /// Image values must lie in [0, 1] before blending.
    #[error("Image values must be in [0, 1], found maximum {0}")]
    ImageRange(f32),

    /// Blend weight outside [0, 1].
    #[error("Image weight must be in [0, 1], got {0}")]
    InvalidWeight(f32),

    /// Map and image sizes differ.
    #[error("Size mismatch: map is {map:?}, image is {image:?}")]
    SizeMismatch {
        /// Map `(height, width)`.
        map: (usize, usize),
        /// Image `(height, width)`.
        image: (usize, usize),
    },

    /// Invalid CAM map construction.
    #[error("Invalid CAM map: {0}")]
    InvalidMap(String),

    /// Target class outside the model's outputs.
    #[error("Target class {target} out of range for {n_classes} classes")]
    InvalidTarget {
        /// Requested class.
        target: usize,
        /// Classes the model predicts.
        n_classes: usize,
    },

    /// The backward pass produced no gradient for the target layer.
    #[error("No gradient reached the target layer")]
    MissingGradient,

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] cnnlens_core::CoreError),

    /// Analysis error.
    #[error("Analysis error: {0}")]
    Analysis(#[from] cnnlens_analysis::AnalysisError),
}
