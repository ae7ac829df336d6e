//! Layer-by-layer architecture summary.
//!
//! Shapes are inferred statically from [`LayerDescriptor`]s, so no forward
//! pass is run. Parameter counts cover trainable weights only; batch norm
//! running statistics are buffers and are not counted.

use std::fmt;

use tracing::debug;

use cnnlens_core::{DescribeLayers, LayerDescriptor, LayerSpec};

use crate::error::{AnalysisError, Result};

const BYTES_PER_ELEMENT: f64 = 4.0;
const MEGABYTE: f64 = 1e6;
const TABLE_WIDTH: usize = 118;

/// One row of a [`ModelSummary`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    /// Layer path, e.g. `convblock1.conv`.
    pub name: String,
    /// Layer type, e.g. `Conv2d`.
    pub layer_type: &'static str,
    /// Kernel shape for convolution and pooling layers.
    pub kernel_shape: Option<[usize; 2]>,
    /// Input shape including the batch dimension.
    pub input_shape: Vec<usize>,
    /// Output shape including the batch dimension.
    pub output_shape: Vec<usize>,
    /// Trainable parameters.
    pub params: usize,
    /// Multiply-accumulate operations for the whole batch.
    pub mult_adds: u64,
}

/// Per-layer shapes, parameter counts and size estimates for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    /// Input size `[N, C, H, W]`.
    pub input_size: [usize; 4],
    /// Rows in execution order.
    pub layers: Vec<LayerSummary>,
}

impl ModelSummary {
    /// Total parameters.
    pub fn total_params(&self) -> usize {
        self.layers.iter().map(|l| l.params).sum()
    }

    /// Trainable parameters.
    pub fn trainable_params(&self) -> usize {
        self.total_params()
    }

    /// Non-trainable parameters.
    pub fn non_trainable_params(&self) -> usize {
        self.total_params() - self.trainable_params()
    }

    /// Total multiply-accumulate operations.
    pub fn total_mult_adds(&self) -> u64 {
        self.layers.iter().map(|l| l.mult_adds).sum()
    }

    /// Output shape of the last layer.
    pub fn output_shape(&self) -> Vec<usize> {
        self.layers
            .last()
            .map_or_else(|| self.input_size.to_vec(), |l| l.output_shape.clone())
    }

    /// Input tensor size in MB.
    pub fn input_size_mb(&self) -> f64 {
        numel(&self.input_size) as f64 * BYTES_PER_ELEMENT / MEGABYTE
    }

    /// Activations kept for the forward and backward pass, in MB.
    pub fn forward_backward_mb(&self) -> f64 {
        let outputs: usize = self.layers.iter().map(|l| numel(&l.output_shape)).sum();
        2.0 * outputs as f64 * BYTES_PER_ELEMENT / MEGABYTE
    }

    /// Parameter storage in MB.
    pub fn params_size_mb(&self) -> f64 {
        self.total_params() as f64 * BYTES_PER_ELEMENT / MEGABYTE
    }

    /// Input + activations + parameters, in MB.
    pub fn estimated_total_mb(&self) -> f64 {
        self.input_size_mb() + self.forward_backward_mb() + self.params_size_mb()
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(TABLE_WIDTH);
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<34}{:<16}{:<20}{:<20}{:>12}{:>16}",
            "Layer (type:name)", "Kernel Shape", "Input Shape", "Output Shape", "Param #", "Mult-Adds"
        )?;
        writeln!(f, "{rule}")?;

        for layer in &self.layers {
            let kernel = layer
                .kernel_shape
                .map_or_else(|| "--".to_string(), |k| format!("{k:?}"));
            let params = if layer.params == 0 {
                "--".to_string()
            } else {
                group_thousands(layer.params as u64)
            };
            let mult_adds = if layer.mult_adds == 0 {
                "--".to_string()
            } else {
                group_thousands(layer.mult_adds)
            };
            writeln!(
                f,
                "{:<34}{:<16}{:<20}{:<20}{:>12}{:>16}",
                format!("{}: {}", layer.layer_type, layer.name),
                kernel,
                format!("{:?}", layer.input_shape),
                format!("{:?}", layer.output_shape),
                params,
                mult_adds,
            )?;
        }

        writeln!(f, "{rule}")?;
        writeln!(f, "Total params: {}", group_thousands(self.total_params() as u64))?;
        writeln!(f, "Trainable params: {}", group_thousands(self.trainable_params() as u64))?;
        writeln!(
            f,
            "Non-trainable params: {}",
            group_thousands(self.non_trainable_params() as u64)
        )?;
        writeln!(f, "Total mult-adds (M): {:.2}", self.total_mult_adds() as f64 / 1e6)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Input size (MB): {:.2}", self.input_size_mb())?;
        writeln!(f, "Forward/backward pass size (MB): {:.2}", self.forward_backward_mb())?;
        writeln!(f, "Params size (MB): {:.2}", self.params_size_mb())?;
        writeln!(f, "Estimated Total Size (MB): {:.2}", self.estimated_total_mb())?;
        write!(f, "{rule}")
    }
}

fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// `1234567` -> `"1,234,567"`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn shape_error(layer: &LayerDescriptor, reason: impl Into<String>) -> AnalysisError {
    AnalysisError::ShapeInference {
        layer: layer.name.clone(),
        reason: reason.into(),
    }
}

/// Output size of a sliding window along one axis, or `None` if the window
/// does not fit.
fn window_out(size: usize, kernel: usize, stride: usize, padding: usize, dilation: usize) -> Option<usize> {
    let span = dilation * (kernel.saturating_sub(1)) + 1;
    let padded = size + 2 * padding;
    if stride == 0 || padded < span {
        return None;
    }
    Some((padded - span) / stride + 1)
}

fn expect_4d(layer: &LayerDescriptor, shape: &[usize]) -> Result<[usize; 4]> {
    match *shape {
        [n, c, h, w] => Ok([n, c, h, w]),
        _ => Err(shape_error(layer, format!("expected a 4D input, got {shape:?}"))),
    }
}

fn summarize_layer(layer: &LayerDescriptor, input: &[usize]) -> Result<LayerSummary> {
    let batch = input.first().copied().unwrap_or(0);
    let (output, kernel_shape, params, mult_adds) = match &layer.spec {
        LayerSpec::Conv2d {
            in_channels,
            out_channels,
            kernel,
            stride,
            padding,
            dilation,
            groups,
            bias,
        } => {
            let [n, c, h, w] = expect_4d(layer, input)?;
            if c != *in_channels {
                return Err(shape_error(
                    layer,
                    format!("expected {in_channels} input channels, got {c}"),
                ));
            }
            if *groups == 0 || in_channels % groups != 0 || out_channels % groups != 0 {
                return Err(shape_error(layer, format!("invalid groups {groups}")));
            }
            let oh = window_out(h, kernel[0], stride[0], padding[0], dilation[0])
                .ok_or_else(|| shape_error(layer, format!("kernel {kernel:?} larger than padded input {h}x{w}")))?;
            let ow = window_out(w, kernel[1], stride[1], padding[1], dilation[1])
                .ok_or_else(|| shape_error(layer, format!("kernel {kernel:?} larger than padded input {h}x{w}")))?;

            let weights = out_channels * (in_channels / groups) * kernel[0] * kernel[1];
            let params = weights + if *bias { *out_channels } else { 0 };
            let mult_adds = params as u64 * (n * oh * ow) as u64;
            (vec![n, *out_channels, oh, ow], Some(*kernel), params, mult_adds)
        }
        LayerSpec::BatchNorm2d { num_features } => {
            let [_, c, _, _] = expect_4d(layer, input)?;
            if c != *num_features {
                return Err(shape_error(
                    layer,
                    format!("expected {num_features} channels, got {c}"),
                ));
            }
            let params = 2 * num_features;
            (input.to_vec(), None, params, (params * batch) as u64)
        }
        LayerSpec::Relu | LayerSpec::Dropout { .. } => (input.to_vec(), None, 0, 0),
        LayerSpec::MaxPool2d {
            kernel,
            stride,
            padding,
        } => {
            let [n, c, h, w] = expect_4d(layer, input)?;
            let oh = window_out(h, kernel[0], stride[0], padding[0], 1);
            let ow = window_out(w, kernel[1], stride[1], padding[1], 1);
            match (oh, ow) {
                (Some(oh), Some(ow)) => (vec![n, c, oh, ow], Some(*kernel), 0, 0),
                _ => {
                    return Err(shape_error(
                        layer,
                        format!("pool window {kernel:?} larger than input {h}x{w}"),
                    ))
                }
            }
        }
        LayerSpec::AdaptiveAvgPool2d { output } => {
            let [n, c, _, _] = expect_4d(layer, input)?;
            (vec![n, c, output[0], output[1]], None, 0, 0)
        }
        LayerSpec::Flatten => {
            if input.len() < 2 {
                return Err(shape_error(layer, format!("cannot flatten {input:?}")));
            }
            (vec![batch, numel(&input[1..])], None, 0, 0)
        }
        LayerSpec::Linear {
            in_features,
            out_features,
            bias,
        } => {
            let last = input.last().copied().unwrap_or(0);
            if input.len() < 2 || last != *in_features {
                return Err(shape_error(
                    layer,
                    format!("expected last dimension {in_features}, got shape {input:?}"),
                ));
            }
            let params = in_features * out_features + if *bias { *out_features } else { 0 };
            let mut output = input.to_vec();
            if let Some(last) = output.last_mut() {
                *last = *out_features;
            }
            (output, None, params, (params * batch) as u64)
        }
    };

    Ok(LayerSummary {
        name: layer.name.clone(),
        layer_type: layer.spec.type_name(),
        kernel_shape,
        input_shape: input.to_vec(),
        output_shape: output,
        params,
        mult_adds,
    })
}

/// Summarize a list of layers for an input of `input_size` `[N, C, H, W]`.
pub fn summarize_layers(layers: &[LayerDescriptor], input_size: [usize; 4]) -> Result<ModelSummary> {
    let mut shape = input_size.to_vec();
    let mut rows = Vec::with_capacity(layers.len());

    for layer in layers {
        let row = summarize_layer(layer, &shape)?;
        debug!(layer = %row.name, output = ?row.output_shape, params = row.params, "summarized layer");
        shape.clone_from(&row.output_shape);
        rows.push(row);
    }

    Ok(ModelSummary {
        input_size,
        layers: rows,
    })
}

/// Summarize a model's architecture for an input of `input_size` `[N, C, H, W]`.
pub fn model_summary<M: DescribeLayers>(model: &M, input_size: [usize; 4]) -> Result<ModelSummary> {
    summarize_layers(&model.layers(), input_size)
}

/// Print [`model_summary`] to stdout and return it.
pub fn print_model_summary<M: DescribeLayers>(model: &M, input_size: [usize; 4]) -> Result<ModelSummary> {
    let summary = model_summary(model, input_size)?;
    println!("{summary}");
    Ok(summary)
}
