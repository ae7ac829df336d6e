//! Error types for cnnlens_render.

use thiserror::Error;

/// Result type alias using [`RenderError`].
pub type Result<T> = std::result::Result<T, RenderError>;

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Grid geometry does not fit the panels.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Sample count not usable for a sample grid.
    #[error("Invalid sample count {count}: {reason}")]
    InvalidSampleCount {
        /// Requested count.
        count: usize,
        /// Why it was rejected.
        reason: String,
    },

    /// Image encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] cnnlens_core::CoreError),

    /// Data error.
    #[error("Data error: {0}")]
    Data(#[from] cnnlens_data::DataError),

    /// Analysis error.
    #[error("Analysis error: {0}")]
    Analysis(#[from] cnnlens_analysis::AnalysisError),

    /// Explain error.
    #[error("Explain error: {0}")]
    Explain(#[from] cnnlens_explain::ExplainError),
}
