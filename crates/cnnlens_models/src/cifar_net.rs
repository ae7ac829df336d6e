//! A compact four-block CNN for 32×32 RGB classification.
//!
//! The network is split into `convblock1` .. `convblock4` so that any block
//! can serve as a Grad-CAM target.

use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
    BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
    Relu,
};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use cnnlens_core::{
    CamTarget, DescribeLayers, ImageClassifier, LayerDescriptor, LayerSpec, TargetLayer,
};

const KERNEL: usize = 3;
const PADDING: usize = 1;
const POOL: usize = 2;

/// Configuration for [`CifarNet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CifarNetConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output classes.
    pub n_classes: usize,
    /// Output channels of `convblock1` .. `convblock4`.
    pub channels: [usize; 4],
    /// Blocks followed by a 2×2 max pool.
    pub pool_after: [bool; 4],
    /// Dropout probability before the classifier.
    pub dropout: f64,
}

impl Default for CifarNetConfig {
    fn default() -> Self {
        Self {
            in_channels: 3,
            n_classes: 10,
            channels: [32, 64, 128, 256],
            pool_after: [false, true, true, false],
            dropout: 0.1,
        }
    }
}

impl CifarNetConfig {
    /// Create a config for `n_classes` outputs with default widths.
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            ..Default::default()
        }
    }

    /// Set the block widths.
    #[must_use]
    pub fn with_channels(mut self, channels: [usize; 4]) -> Self {
        self.channels = channels;
        self
    }

    /// Set the dropout probability.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Initialize the model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> CifarNet<B> {
        CifarNet::new(self, device)
    }
}

/// Conv3x3 -> BatchNorm -> ReLU, optionally followed by a 2×2 max pool.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, pool: bool, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [KERNEL, KERNEL])
            .with_padding(PaddingConfig2d::Explicit(PADDING, PADDING))
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        let pool = pool.then(|| MaxPool2dConfig::new([POOL, POOL]).with_strides([POOL, POOL]).init());

        Self { conv, bn, pool }
    }

    /// Forward pass through the block.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.conv.forward(x);
        let out = self.bn.forward(out);
        let out = Relu::new().forward(out);
        match &self.pool {
            Some(pool) => pool.forward(out),
            None => out,
        }
    }

    /// Forward pass using the batch norm running statistics regardless of
    /// backend.
    ///
    /// Autodiff backends put `BatchNorm` in training mode; this keeps the
    /// evaluation behaviour while still tracking gradients.
    pub fn forward_inference(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.conv.forward(x);
        let channels = out.dims()[1];
        let shape = [1, channels, 1, 1];

        let mean = self.bn.running_mean.value().reshape(shape);
        let var = self.bn.running_var.value().reshape(shape);
        let gamma = self.bn.gamma.val().reshape(shape);
        let beta = self.bn.beta.val().reshape(shape);
        let out = (out - mean) / (var + self.bn.epsilon).sqrt() * gamma + beta;

        let out = Relu::new().forward(out);
        match &self.pool {
            Some(pool) => pool.forward(out),
            None => out,
        }
    }

    fn describe(&self, prefix: &str, layers: &mut Vec<LayerDescriptor>) {
        let [out_channels, in_channels, kh, _] = self.conv.weight.val().dims();
        layers.push(LayerDescriptor::new(
            format!("{prefix}.conv"),
            LayerSpec::conv2d(in_channels, out_channels, kh, PADDING, self.conv.bias.is_some()),
        ));
        layers.push(LayerDescriptor::new(
            format!("{prefix}.bn"),
            LayerSpec::BatchNorm2d {
                num_features: out_channels,
            },
        ));
        layers.push(LayerDescriptor::new(format!("{prefix}.relu"), LayerSpec::Relu));
        if self.pool.is_some() {
            layers.push(LayerDescriptor::new(
                format!("{prefix}.pool"),
                LayerSpec::MaxPool2d {
                    kernel: [POOL, POOL],
                    stride: [POOL, POOL],
                    padding: [0, 0],
                },
            ));
        }
    }
}

/// Four convolutional blocks, global average pooling, dropout and a linear
/// classifier.
///
/// # Example
///
/// ```rust,ignore
/// use cnnlens_models::CifarNetConfig;
///
/// let model = CifarNetConfig::new(10).init::<NdArray>(&device);
/// let logits = model.forward(Tensor::zeros([8, 3, 32, 32], &device));
/// // logits shape: [8, 10]
/// ```
#[derive(Module, Debug)]
pub struct CifarNet<B: Backend> {
    convblock1: ConvBlock<B>,
    convblock2: ConvBlock<B>,
    convblock3: ConvBlock<B>,
    convblock4: ConvBlock<B>,
    gap: AdaptiveAvgPool2d,
    dropout: Dropout,
    fc: Linear<B>,
    #[module(skip)]
    n_classes: usize,
}

impl<B: Backend> CifarNet<B> {
    /// Create a new model.
    pub fn new(config: &CifarNetConfig, device: &B::Device) -> Self {
        let [c1, c2, c3, c4] = config.channels;
        let [p1, p2, p3, p4] = config.pool_after;

        Self {
            convblock1: ConvBlock::new(config.in_channels, c1, p1, device),
            convblock2: ConvBlock::new(c1, c2, p2, device),
            convblock3: ConvBlock::new(c2, c3, p3, device),
            convblock4: ConvBlock::new(c3, c4, p4, device),
            gap: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(config.dropout).init(),
            fc: LinearConfig::new(c4, config.n_classes).init(device),
            n_classes: config.n_classes,
        }
    }

    fn blocks(&self) -> [&ConvBlock<B>; 4] {
        [
            &self.convblock1,
            &self.convblock2,
            &self.convblock3,
            &self.convblock4,
        ]
    }

    fn pool_flatten(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let out = self.gap.forward(x);
        let [batch, channels, _, _] = out.dims();
        out.reshape([batch, channels])
    }
}

impl<B: Backend> ImageClassifier<B> for CifarNet<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let out = self.blocks().iter().fold(x, |acc, block| block.forward(acc));
        let out = self.pool_flatten(out);
        self.fc.forward(self.dropout.forward(out))
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl<B: Backend> CamTarget<B> for CifarNet<B> {
    fn features(&self, x: Tensor<B, 4>, layer: TargetLayer) -> Tensor<B, 4> {
        self.blocks()[..=layer.block_position()]
            .iter()
            .fold(x, |acc, block| block.forward(acc))
    }

    /// Remaining blocks and the classifier, in inference form: running batch
    /// norm statistics and no dropout.
    fn head(&self, activations: Tensor<B, 4>, layer: TargetLayer) -> Tensor<B, 2> {
        let out = self.blocks()[layer.block_position() + 1..]
            .iter()
            .fold(activations, |acc, block| block.forward_inference(acc));
        self.fc.forward(self.pool_flatten(out))
    }
}

impl<B: Backend> DescribeLayers for CifarNet<B> {
    fn layers(&self) -> Vec<LayerDescriptor> {
        let mut layers = Vec::new();
        for (i, block) in self.blocks().iter().enumerate() {
            block.describe(&format!("convblock{}", i + 1), &mut layers);
        }

        let [in_features, out_features] = self.fc.weight.val().dims();
        layers.push(LayerDescriptor::new(
            "gap",
            LayerSpec::AdaptiveAvgPool2d { output: [1, 1] },
        ));
        layers.push(LayerDescriptor::new("flatten", LayerSpec::Flatten));
        layers.push(LayerDescriptor::new(
            "dropout",
            LayerSpec::Dropout {
                prob: self.dropout.prob,
            },
        ));
        layers.push(LayerDescriptor::new(
            "fc",
            LayerSpec::Linear {
                in_features,
                out_features,
                bias: self.fc.bias.is_some(),
            },
        ));
        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use cnnlens_core::float_tensor_to_vec;

    type TestBackend = NdArray;

    fn small_config() -> CifarNetConfig {
        CifarNetConfig::new(4).with_channels([4, 8, 8, 16])
    }

    #[test]
    fn test_config_default() {
        let config = CifarNetConfig::default();
        assert_eq!(config.in_channels, 3);
        assert_eq!(config.n_classes, 10);
        assert_eq!(config.channels, [32, 64, 128, 256]);
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let logits = model.forward(Tensor::zeros([2, 3, 16, 16], &device));
        assert_eq!(logits.dims(), [2, 4]);
        assert_eq!(model.n_classes(), 4);
    }

    #[test]
    fn test_feature_shapes_per_block() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 16, 16], &device);

        assert_eq!(model.features(x.clone(), TargetLayer::Block1).dims(), [1, 4, 16, 16]);
        assert_eq!(model.features(x.clone(), TargetLayer::Block2).dims(), [1, 8, 8, 8]);
        assert_eq!(model.features(x.clone(), TargetLayer::Block3).dims(), [1, 8, 4, 4]);
        assert_eq!(model.features(x, TargetLayer::Block4).dims(), [1, 16, 4, 4]);
    }

    #[test]
    fn test_head_of_features_matches_forward() {
        let device = Default::default();
        let model = small_config().with_dropout(0.0).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::random(
            [2, 3, 8, 8],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        let direct = model.forward(x.clone());
        for layer in [TargetLayer::Block1, TargetLayer::Block3, TargetLayer::Block4] {
            let split = model.head(model.features(x.clone(), layer), layer);
            let a = float_tensor_to_vec(direct.clone());
            let b = float_tensor_to_vec(split);
            assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-5));
        }
    }

    #[test]
    fn test_autodiff_head_matches_evaluation_forward() {
        use burn::module::AutodiffModule;
        use burn_autodiff::Autodiff;

        type AdBackend = Autodiff<NdArray>;

        let device = Default::default();
        let model = small_config().init::<AdBackend>(&device);
        let eval = model.clone().valid();
        let x = Tensor::<NdArray, 4>::random(
            [2, 3, 8, 8],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        let expected = float_tensor_to_vec(eval.forward(x.clone()));
        for layer in [TargetLayer::Block1, TargetLayer::Block2, TargetLayer::Block4] {
            let features = Tensor::<AdBackend, 4>::from_inner(eval.features(x.clone(), layer));
            let split = float_tensor_to_vec(model.head(features, layer).inner());
            assert!(expected.iter().zip(&split).all(|(a, b)| (a - b).abs() < 1e-5));
        }
    }

    #[test]
    fn test_layers_describe_blocks() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let layers = model.layers();

        // 4 x (conv, bn, relu) + 2 pools + gap, flatten, dropout, fc
        assert_eq!(layers.len(), 4 * 3 + 2 + 4);
        assert_eq!(layers[0].name, "convblock1.conv");
        assert_eq!(layers[0].spec, LayerSpec::conv2d(3, 4, 3, 1, false));
        assert_eq!(
            layers.last().unwrap().spec,
            LayerSpec::Linear {
                in_features: 16,
                out_features: 4,
                bias: true
            }
        );
    }
}
