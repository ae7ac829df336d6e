//! Plot configuration.

use serde::{Deserialize, Serialize};

use cnnlens_core::{Normalization, TargetLayer};

use crate::error::Result;

/// Options shared by the misclassified and Grad-CAM plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Grid rows.
    pub rows: usize,
    /// Grid columns.
    pub columns: usize,
    /// Weight of the image when blending a Grad-CAM heatmap.
    pub transparency: f32,
    /// Grad-CAM target layer index: 1 is the deepest block, 4 the first.
    pub layer: usize,
    /// Statistics the loader normalized with.
    pub normalization: Normalization,
    /// Integer upscale applied to each tile.
    pub tile_scale: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            columns: 5,
            transparency: 0.725,
            layer: 1,
            normalization: Normalization::CIFAR10,
            tile_scale: 4,
        }
    }
}

impl PlotConfig {
    /// Number of panels in the grid.
    pub fn n_panels(&self) -> usize {
        self.rows * self.columns
    }

    /// Resolve `layer` to a block.
    pub fn target_layer(&self) -> Result<TargetLayer> {
        Ok(TargetLayer::from_index(self.layer)?)
    }

    /// Set the grid shape.
    #[must_use]
    pub fn with_grid(mut self, rows: usize, columns: usize) -> Self {
        self.rows = rows;
        self.columns = columns;
        self
    }

    /// Set the Grad-CAM layer index.
    #[must_use]
    pub fn with_layer(mut self, layer: usize) -> Self {
        self.layer = layer;
        self
    }

    /// Set the image blend weight.
    #[must_use]
    pub fn with_transparency(mut self, transparency: f32) -> Self {
        self.transparency = transparency;
        self
    }

    /// Set the loader's normalization.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlotConfig::default();
        assert_eq!(config.n_panels(), 15);
        assert_eq!(config.transparency, 0.725);
        assert_eq!(config.target_layer().unwrap(), TargetLayer::Block4);
    }

    #[test]
    fn test_invalid_layer() {
        assert!(PlotConfig::default().with_layer(5).target_layer().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: PlotConfig = serde_json::from_str(r#"{"rows": 2, "layer": 3}"#).unwrap();
        assert_eq!(config.rows, 2);
        assert_eq!(config.columns, 5);
        assert_eq!(config.target_layer().unwrap(), TargetLayer::Block2);
    }
}
