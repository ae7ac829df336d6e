//! Error types for cnnlens_data.

use thiserror::Error;

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur in data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Invalid data shape.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Empty dataset.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Index out of bounds.
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the collection.
        length: usize,
    },

    /// A label does not name a known class.
    #[error("Label {label} out of range for {n_classes} classes")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Number of known classes.
        n_classes: usize,
    },

    /// Batch size error.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// File format error.
    #[error("File format error: {0}")]
    FormatError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] cnnlens_core::CoreError),
}
