//! # cnnlens_data
//!
//! Dataset and dataloader implementations for cnnlens.
//!
//! This crate provides:
//! - [`ImageDataset`] for labelled images in `(N, C, H, W)` layout
//! - [`ImageDataLoader`] for batched, optionally shuffled and normalized iteration
//! - NPY readers for images and labels
//! - [`class_distribution`] for per-class sample counts
//!
//! ## Example
//!
//! ```rust,ignore
//! use cnnlens_data::{read_images_npy, read_labels_npy, ImageDataset, ImageDataLoader, cifar10_class_names};
//! use cnnlens_core::Normalization;
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
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod dataset;
mod error;
mod io;
mod loader;
mod stats;

pub use dataset::ImageDataset;
pub use error::{DataError, Result};
pub use io::{read_images_npy, read_labels_npy};
pub use loader::{ImageDataLoader, ImageDataLoaderBuilder, ImageDataLoaderIter};
pub use stats::{class_distribution, print_data_stats, ClassDistribution};

/// CIFAR-10 class names, indexed by label.
pub const CIFAR10_CLASSES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// CIFAR-10 class names as owned strings.
#[must_use]
pub fn cifar10_class_names() -> Vec<String> {
    CIFAR10_CLASSES.iter().map(|s| (*s).to_string()).collect()
}
