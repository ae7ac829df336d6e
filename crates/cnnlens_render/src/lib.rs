//! # cnnlens_render
//!
//! Figures for inspecting an image classifier.
//!
//! This crate provides:
//! - [`Figure`] grids of image tiles with per-panel titles, saved as PNG
//! - [`plot_misclassified`] and [`plot_grad_cam`] grids titled `predicted/actual`
//! - [`plot_network_performance`] text charts of loss and accuracy curves
//! - [`sample_grid`] for a first look at a loader's images
//!
//! ## Example
//!
//! ```rust,ignore
//! use cnnlens_render::{plot_misclassified, PlotConfig};
//!
//! let figure = plot_misclassified(&model.valid(), &loader, &device, loader.class_names(), &PlotConfig::default())?;
//! figure.save("misclassified.png")?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod chart;
mod config;
mod error;
mod figure;
mod performance;
mod plots;

pub use chart::LineChart;
pub use config::PlotConfig;
pub use error::{RenderError, Result};
pub use figure::{hwc_to_rgb, Figure, CAPTION_HEIGHT, PADDING};
pub use performance::{
    plot_network_performance, plot_network_performance_with, ChartPanel, PerformanceChart,
    PERFORMANCE_TITLES,
};
pub use plots::{
    plot_grad_cam, plot_misclassified, sample_grid, MISCLASSIFIED_LEGEND, MISCLASSIFIED_XLABEL,
    MISCLASSIFIED_YLABEL, SAMPLES_PER_ROW,
};
