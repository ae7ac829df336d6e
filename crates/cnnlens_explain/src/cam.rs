//! Class activation maps and the arithmetic that produces them.

use burn::prelude::*;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

use cnnlens_core::float_tensor_to_vec;

use crate::error::{ExplainError, Result};

const NORMALIZE_EPS: f32 = 1e-7;

/// A grayscale saliency map, row-major `height × width`.
#[derive(Debug, Clone, PartialEq)]
pub struct CamMap {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl CamMap {
    /// Create a map from row-major values.
    pub fn new(height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(ExplainError::InvalidMap(format!("empty map {height}x{width}")));
        }
        if data.len() != height * width {
            return Err(ExplainError::InvalidMap(format!(
                "expected {} values for {height}x{width}, got {}",
                height * width,
                data.len()
            )));
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Map height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Map width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(y, x)`.
    pub fn get(&self, y: usize, x: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Largest value.
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Smallest value.
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Clamp negative values to zero.
    #[must_use]
    pub fn relu(mut self) -> Self {
        self.data.iter_mut().for_each(|v| *v = v.max(0.0));
        self
    }

    /// Shift to a zero minimum and divide by `max + 1e-7`.
    ///
    /// A constant map becomes all zeros.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        let min = self.min_value();
        self.data.iter_mut().for_each(|v| *v -= min);
        let max = self.max_value();
        self.data.iter_mut().for_each(|v| *v /= max + NORMALIZE_EPS);
        self
    }

    /// Mirror left to right.
    #[must_use]
    pub fn flip_horizontal(mut self) -> Self {
        for row in self.data.chunks_mut(self.width) {
            row.reverse();
        }
        self
    }

    /// Bilinear resize with half-pixel centres.
    #[must_use]
    pub fn resize(&self, height: usize, width: usize) -> Self {
        if height == self.height && width == self.width {
            return self.clone();
        }
        let height = height.max(1);
        let width = width.max(1);
        let sy = self.height as f32 / height as f32;
        let sx = self.width as f32 / width as f32;

        let source = |dst: usize, scale: f32, len: usize| {
            let pos = ((dst as f32 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f32);
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(len - 1);
            (lo, hi, pos - lo as f32)
        };

        let mut data = Vec::with_capacity(height * width);
        for y in 0..height {
            let (y0, y1, fy) = source(y, sy, self.height);
            for x in 0..width {
                let (x0, x1, fx) = source(x, sx, self.width);
                let top = self.get(y0, x0) * (1.0 - fx) + self.get(y0, x1) * fx;
                let bottom = self.get(y1, x0) * (1.0 - fx) + self.get(y1, x1) * fx;
                data.push(top * (1.0 - fy) + bottom * fy);
            }
        }

        Self {
            height,
            width,
            data,
        }
    }

    /// Element-wise mean of maps of equal size.
    pub fn mean(maps: &[CamMap]) -> Result<Self> {
        let first = maps
            .first()
            .ok_or_else(|| ExplainError::InvalidMap("no maps to average".to_string()))?;
        let mut data = vec![0.0f32; first.data.len()];
        for map in maps {
            if map.height != first.height || map.width != first.width {
                return Err(ExplainError::SizeMismatch {
                    map: (map.height, map.width),
                    image: (first.height, first.width),
                });
            }
            data.iter_mut().zip(&map.data).for_each(|(acc, v)| *acc += v);
        }
        let n = maps.len() as f32;
        data.iter_mut().for_each(|v| *v /= n);
        Self::new(first.height, first.width, data)
    }
}

/// Weight each activation channel by the spatial mean of its gradient.
///
/// Both tensors are `(batch, channels, height, width)`.
pub fn weighted_activations<B: Backend>(
    activations: Tensor<B, 4>,
    gradients: Tensor<B, 4>,
) -> Tensor<B, 4> {
    // (batch, channels, h, w) -> (batch, channels, 1, 1)
    let weights = gradients.mean_dim(3).mean_dim(2);
    activations * weights
}

/// Sum weighted activations over channels, one map per image.
pub fn channel_sum_cam<B: Backend>(weighted: Tensor<B, 4>) -> Result<Vec<CamMap>> {
    let [batch, _, height, width] = weighted.dims();
    let values = float_tensor_to_vec(weighted.sum_dim(1));
    values
        .chunks(height * width)
        .take(batch)
        .map(|chunk| CamMap::new(height, width, chunk.to_vec()))
        .collect()
}

/// Project weighted activations onto their first principal component.
///
/// Each image's activations are arranged as an `(h·w) × channels` matrix,
/// every column is centred on its mean, and the rows are projected onto the
/// first right-singular vector. The vector's sign is chosen so its components
/// sum to a non-negative value.
pub fn principal_projection_cam<B: Backend>(weighted: Tensor<B, 4>) -> Result<Vec<CamMap>> {
    let [batch, channels, height, width] = weighted.dims();
    let pixels = height * width;
    let values = float_tensor_to_vec(weighted);

    values
        .chunks(channels * pixels)
        .take(batch)
        .map(|image| {
            // Channel planes become columns, centred per channel.
            let mut matrix = DMatrix::from_iterator(
                pixels,
                channels,
                image.iter().map(|&v| f64::from(v)),
            );
            for mut column in matrix.column_iter_mut() {
                let mean = column.mean();
                column.add_scalar_mut(-mean);
            }

            let direction = first_right_singular_vector(&matrix);
            let projection = (&matrix * direction).iter().map(|&v| v as f32).collect();
            CamMap::new(height, width, projection)
        })
        .collect()
}

/// Eigenvector of `XᵀX` with the largest eigenvalue, signed to sum ≥ 0.
fn first_right_singular_vector(matrix: &DMatrix<f64>) -> DVector<f64> {
    let eigen = SymmetricEigen::new(matrix.tr_mul(matrix));
    let top = eigen.eigenvalues.imax();
    let v = eigen.eigenvectors.column(top).into_owned();
    if v.sum() < 0.0 {
        -v
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn tensor(values: Vec<f32>, shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_new_rejects_bad_length() {
        assert!(CamMap::new(2, 2, vec![0.0; 3]).is_err());
        assert!(CamMap::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_normalize_range() {
        let map = CamMap::new(1, 4, vec![2.0, 4.0, 6.0, 10.0]).unwrap().normalize();
        assert!(map.min_value().abs() < 1e-6);
        assert!((map.max_value() - 1.0).abs() < 1e-5);
        assert!((map.get(0, 1) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_constant_map() {
        let map = CamMap::new(2, 2, vec![3.0; 4]).unwrap().normalize();
        assert!(map.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_relu_and_flip() {
        let map = CamMap::new(1, 3, vec![-1.0, 0.5, 2.0]).unwrap().relu();
        assert_eq!(map.as_slice(), &[0.0, 0.5, 2.0]);
        assert_eq!(map.flip_horizontal().as_slice(), &[2.0, 0.5, 0.0]);
    }

    #[test]
    fn test_resize_upsample() {
        let map = CamMap::new(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let big = map.resize(4, 4);
        assert_eq!((big.height(), big.width()), (4, 4));
        // Corners keep the source values under half-pixel sampling.
        assert_eq!(big.get(0, 0), 0.0);
        assert_eq!(big.get(3, 3), 3.0);
        // Interpolated values stay within the source range.
        assert!(big.as_slice().iter().all(|&v| (0.0..=3.0).contains(&v)));
        assert!((big.get(0, 1) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_resize_constant() {
        let map = CamMap::new(3, 3, vec![0.7; 9]).unwrap().resize(8, 5);
        assert!(map.as_slice().iter().all(|&v| (v - 0.7).abs() < 1e-6));
    }

    #[test]
    fn test_mean() {
        let a = CamMap::new(1, 2, vec![0.0, 1.0]).unwrap();
        let b = CamMap::new(1, 2, vec![1.0, 1.0]).unwrap();
        assert_eq!(CamMap::mean(&[a, b]).unwrap().as_slice(), &[0.5, 1.0]);
        assert!(CamMap::mean(&[]).is_err());
    }

    #[test]
    fn test_weighted_activations_channel_sum() {
        // Two channels of 2x2; gradients average 1.0 and -0.5.
        let activations = tensor(vec![1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 1.0], [1, 2, 2, 2]);
        let gradients = tensor(vec![1.0, 1.0, 1.0, 1.0, -1.0, 0.0, -1.0, 0.0], [1, 2, 2, 2]);

        let weighted = weighted_activations(activations, gradients);
        let cams = channel_sum_cam(weighted).unwrap();

        assert_eq!(cams.len(), 1);
        let expected = [0.5, 1.5, 2.5, 3.5];
        for (v, e) in cams[0].as_slice().iter().zip(expected) {
            assert!((v - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_principal_projection_rank_one() {
        // Both channels follow the same spatial pattern, so the projection is
        // proportional to the centred pattern.
        let pattern = [0.0f32, 1.0, 2.0, 3.0];
        let mut values = pattern.to_vec();
        values.extend(pattern.iter().map(|v| 2.0 * v));
        let cams = principal_projection_cam(tensor(values, [1, 2, 2, 2])).unwrap();

        let map = &cams[0];
        let centred: Vec<f32> = pattern.iter().map(|v| v - 1.5).collect();
        let scale = map.get(0, 3) / centred[3];
        assert!(scale > 0.0);
        for (i, c) in centred.iter().enumerate() {
            assert!((map.as_slice()[i] - c * scale).abs() < 1e-4);
        }
    }

    #[test]
    fn test_principal_projection_close_eigenvalues() {
        // Centred channels with disjoint support: XᵀX = diag(2, 1.98), so the
        // projection follows channel 0 alone.
        let b = 0.99f32.sqrt();
        let values = vec![1.0, -1.0, 0.0, 0.0, 0.0, 0.0, b, -b];
        let cams = principal_projection_cam(tensor(values, [1, 2, 2, 2])).unwrap();

        let map = &cams[0];
        assert!((map.get(0, 0) - 1.0).abs() < 1e-5);
        assert!((map.get(0, 1) + 1.0).abs() < 1e-5);
        assert!(map.get(1, 0).abs() < 1e-5);
        assert!(map.get(1, 1).abs() < 1e-5);
    }

    #[test]
    fn test_principal_projection_sign() {
        // Negating every channel negates the projection.
        let values = vec![3.0, 0.0, 1.0, 0.0, 1.5, 0.0, 0.5, 0.0];
        let negated: Vec<f32> = values.iter().map(|v| -v).collect();
        let a = principal_projection_cam(tensor(values, [1, 2, 2, 2])).unwrap();
        let b = principal_projection_cam(tensor(negated, [1, 2, 2, 2])).unwrap();
        for (x, y) in a[0].as_slice().iter().zip(b[0].as_slice()) {
            assert!((x + y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_principal_projection_zero_input() {
        let cams = principal_projection_cam(tensor(vec![0.0; 8], [2, 1, 2, 2])).unwrap();
        assert_eq!(cams.len(), 2);
        assert!(cams.iter().all(|m| m.as_slice().iter().all(|&v| v == 0.0)));
    }
}
