//! Error types for cnnlens_analysis.

use thiserror::Error;

/// Result type alias using [`AnalysisError`].
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Analysis errors.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// More misclassified examples were requested than exist.
    #[error("Requested {requested} misclassified examples but only {found} were found")]
    NotEnoughMisclassified {
        /// Number requested.
        requested: usize,
        /// Number found.
        found: usize,
    },

    /// The training history has fewer epochs than requested.
    #[error("Requested {requested} epochs but '{series}' only has {available}")]
    HistoryTooShort {
        /// Number of epochs requested.
        requested: usize,
        /// Name of the shortest series.
        series: &'static str,
        /// Entries available in that series.
        available: usize,
    },

    /// A layer cannot accept the incoming shape.
    #[error("Shape inference failed at '{layer}': {reason}")]
    ShapeInference {
        /// Layer name.
        layer: String,
        /// Why the shape was rejected.
        reason: String,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] cnnlens_core::CoreError),

    /// Data error.
    #[error("Data error: {0}")]
    Data(#[from] cnnlens_data::DataError),
}
