//! # cnnlens_analysis
//!
//! Analysis utilities for cnnlens: misclassified examples, training logs and
//! architecture summaries.
//!
//! This crate provides tools for inspecting a trained classifier:
//! - [`find_incorrect_predictions`] and [`misclassified_images`]
//! - [`TrainingHistory`] with a formatted per-epoch log
//! - [`model_summary`] in the style of a layer-by-layer table

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod misclassified;
mod summary;
mod train_log;

pub use error::{AnalysisError, Result};
pub use misclassified::{find_incorrect_predictions, misclassified_images, IncorrectPredictions};
pub use summary::{model_summary, print_model_summary, summarize_layers, LayerSummary, ModelSummary};
pub use train_log::{print_train_log, TrainLog, TrainingHistory};
