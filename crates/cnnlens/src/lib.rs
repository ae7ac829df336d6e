//! # cnnlens
//!
//! Inspection helpers for convolutional image classifiers built with burn.
//!
//! - **Data**: image datasets, normalizing dataloaders, NPY loading, class counts
//! - **Models**: a reference four-block CNN and checkpoints
//! - **Analysis**: misclassified examples, training logs, architecture summaries
//! - **Explainability**: Grad-CAM with augmentation and eigen smoothing, heatmap overlays
//! - **Rendering**: figure grids, text performance charts, sample grids
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cnnlens::prelude::*;
//!
//! let dataset = ImageDataset::new(
//!     read_images_npy("test_x.npy")?,
//!     read_labels_npy("test_y.npy")?,
//!     cifar10_class_names(),
//! )?;
//! let loader = ImageDataLoader::builder(dataset)
//!     .batch_size(128)
//!     .normalization(Normalization::CIFAR10)
//!     .build()?;
//!
//! let (model, _) = load_checkpoint::<Autodiff<NdArray>>("cifar.mpk", &device)?;
//! let config = PlotConfig::default();
//! plot_misclassified(&model.valid(), &loader, &device, loader.class_names(), &config)?
//!     .save("misclassified.png")?;
//! plot_grad_cam(&model, &loader, &device, loader.class_names(), &config)?
//!     .save("gradcam.png")?;
//! ```
//!
//! ## Feature Flags
//!
//! - `backend-ndarray` (default): CPU backend using ndarray

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use cnnlens_analysis as analysis;
pub use cnnlens_core as core;
pub use cnnlens_data as data;
pub use cnnlens_explain as explain;
pub use cnnlens_models as models;
pub use cnnlens_render as render;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use cnnlens::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cnnlens_core::{
        CamTarget, DescribeLayers, HwcImage, ImageBatch, ImageClassifier, ImageShape,
        LayerDescriptor, LayerSpec, Normalization, TargetLayer,
    };

    // Data
    pub use cnnlens_data::{
        cifar10_class_names, class_distribution, print_data_stats, read_images_npy,
        read_labels_npy, ClassDistribution, ImageDataLoader, ImageDataset, CIFAR10_CLASSES,
    };

    // Models
    pub use cnnlens_models::{
        load_checkpoint, load_model, save_checkpoint, save_model, CheckpointMetadata, CifarNet,
        CifarNetConfig,
    };

    // Analysis
    pub use cnnlens_analysis::{
        find_incorrect_predictions, misclassified_images, model_summary, print_model_summary,
        print_train_log, IncorrectPredictions, ModelSummary, TrainingHistory,
    };

    // Explain
    pub use cnnlens_explain::{
        grad_cam_images, show_cam_on_image, CamMap, GradCam, GradCamConfig,
    };

    // Render
    pub use cnnlens_render::{
        plot_grad_cam, plot_misclassified, plot_network_performance, sample_grid, Figure,
        PerformanceChart, PlotConfig,
    };

    #[cfg(feature = "backend-ndarray")]
    pub use cnnlens_core::backend::NdArray;
}
