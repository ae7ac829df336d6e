//! Static descriptions of network layers, used for architecture summaries.

use serde::{Deserialize, Serialize};

/// The kind and hyper-parameters of a single leaf layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerSpec {
    /// 2D convolution.
    Conv2d {
        /// Input channels.
        in_channels: usize,
        /// Output channels.
        out_channels: usize,
        /// Kernel size `[kh, kw]`.
        kernel: [usize; 2],
        /// Stride `[sh, sw]`.
        stride: [usize; 2],
        /// Zero padding `[ph, pw]`.
        padding: [usize; 2],
        /// Dilation `[dh, dw]`.
        dilation: [usize; 2],
        /// Channel groups.
        groups: usize,
        /// Whether the layer has a bias term.
        bias: bool,
    },
    /// Batch normalization over channels.
    BatchNorm2d {
        /// Normalized channels.
        num_features: usize,
    },
    /// Rectified linear unit.
    Relu,
    /// Dropout.
    Dropout {
        /// Drop probability.
        prob: f64,
    },
    /// 2D max pooling.
    MaxPool2d {
        /// Window size.
        kernel: [usize; 2],
        /// Stride.
        stride: [usize; 2],
        /// Zero padding.
        padding: [usize; 2],
    },
    /// Adaptive average pooling to a fixed output size.
    AdaptiveAvgPool2d {
        /// Output `[h, w]`.
        output: [usize; 2],
    },
    /// Flatten all but the batch dimension.
    Flatten,
    /// Fully connected layer.
    Linear {
        /// Input features.
        in_features: usize,
        /// Output features.
        out_features: usize,
        /// Whether the layer has a bias term.
        bias: bool,
    },
}

impl LayerSpec {
    /// A 3×3 (or any square) convolution with stride 1, no dilation or groups.
    #[must_use]
    pub fn conv2d(in_channels: usize, out_channels: usize, kernel: usize, padding: usize, bias: bool) -> Self {
        Self::Conv2d {
            in_channels,
            out_channels,
            kernel: [kernel, kernel],
            stride: [1, 1],
            padding: [padding, padding],
            dilation: [1, 1],
            groups: 1,
            bias,
        }
    }

    /// Type name as shown in summaries.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Conv2d { .. } => "Conv2d",
            Self::BatchNorm2d { .. } => "BatchNorm2d",
            Self::Relu => "ReLU",
            Self::Dropout { .. } => "Dropout",
            Self::MaxPool2d { .. } => "MaxPool2d",
            Self::AdaptiveAvgPool2d { .. } => "AdaptiveAvgPool2d",
            Self::Flatten => "Flatten",
            Self::Linear { .. } => "Linear",
        }
    }
}

/// A named leaf layer in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Dotted path of the layer inside the model, e.g. `convblock1.conv`.
    pub name: String,
    /// What the layer is.
    pub spec: LayerSpec,
}

impl LayerDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, spec: LayerSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }

    /// The block part of the name (`convblock1` for `convblock1.conv`), if any.
    #[must_use]
    pub fn block(&self) -> Option<&str> {
        self.name.split_once('.').map(|(block, _)| block)
    }
}
