//! In-memory labelled image dataset.

use ndarray::{Array4, ArrayView3, Axis};

use crate::error::{DataError, Result};
use cnnlens_core::ImageShape;

/// A dataset of labelled images.
///
/// Stores images in the `(N, C, H, W)` format together with one class index
/// per image and the names of all classes.
///
/// # Example
///
/// ```rust,ignore
/// use cnnlens_data::{ImageDataset, CIFAR10_CLASSES};
/// use ndarray::Array4;
///
/// let images = Array4::<f32>::zeros((100, 3, 32, 32));
/// let labels = vec![0; 100];
/// let dataset = ImageDataset::new(images, labels, CIFAR10_CLASSES.iter().map(|s| s.to_string()).collect())?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageDataset {
    images: Array4<f32>,
    labels: Vec<usize>,
    class_names: Vec<String>,
}

impl ImageDataset {
    /// Create a new dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of labels differs from the number of
    /// images, or any label is not a valid class index.
    pub fn new(images: Array4<f32>, labels: Vec<usize>, class_names: Vec<String>) -> Result<Self> {
        let n_samples = images.shape()[0];
        if labels.len() != n_samples {
            return Err(DataError::InvalidShape(format!(
                "images has {} samples but labels has {}",
                n_samples,
                labels.len()
            )));
        }
        let n_classes = class_names.len();
        if let Some(&label) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(DataError::LabelOutOfRange { label, n_classes });
        }

        Ok(Self {
            images,
            labels,
            class_names,
        })
    }

    /// Create a dataset whose classes are named by their index.
    pub fn with_numbered_classes(images: Array4<f32>, labels: Vec<usize>) -> Result<Self> {
        let n_classes = labels.iter().max().map_or(0, |m| m + 1);
        let names = (0..n_classes).map(|i| i.to_string()).collect();
        Self::new(images, labels, names)
    }

    /// Get the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Shape of each image.
    #[must_use]
    pub fn image_shape(&self) -> ImageShape {
        let s = self.images.shape();
        ImageShape::new(s[1], s[2], s[3])
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Class names, indexed by label.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// All labels in dataset order.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// All images.
    #[must_use]
    pub fn images(&self) -> &Array4<f32> {
        &self.images
    }

    /// Get one image (C, H, W) and its label.
    pub fn get(&self, index: usize) -> Result<(ArrayView3<'_, f32>, usize)> {
        if index >= self.len() {
            return Err(DataError::IndexOutOfBounds {
                index,
                length: self.len(),
            });
        }
        Ok((self.images.index_axis(Axis(0), index), self.labels[index]))
    }

    /// Get a subset of samples by indices.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(DataError::IndexOutOfBounds {
                index,
                length: self.len(),
            });
        }

        let images = self.images.select(Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i]).collect();

        Ok(Self {
            images,
            labels,
            class_names: self.class_names.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("class{i}")).collect()
    }

    #[test]
    fn test_dataset_creation() {
        let ds = ImageDataset::new(Array4::zeros((10, 3, 8, 8)), vec![1; 10], names(2)).unwrap();
        assert_eq!(ds.len(), 10);
        assert_eq!(ds.image_shape(), ImageShape::new(3, 8, 8));
        assert_eq!(ds.n_classes(), 2);
    }

    #[test]
    fn test_dataset_rejects_mismatch() {
        assert!(ImageDataset::new(Array4::zeros((10, 3, 8, 8)), vec![0; 9], names(2)).is_err());
    }

    #[test]
    fn test_dataset_rejects_unknown_label() {
        let err = ImageDataset::new(Array4::zeros((2, 3, 4, 4)), vec![0, 5], names(3)).unwrap_err();
        assert!(matches!(err, DataError::LabelOutOfRange { label: 5, n_classes: 3 }));
    }

    #[test]
    fn test_get_and_subset() {
        let mut images = Array4::zeros((4, 3, 2, 2));
        images[[2, 0, 0, 0]] = 7.0;
        let ds = ImageDataset::new(images, vec![0, 1, 2, 1], names(3)).unwrap();

        let (img, label) = ds.get(2).unwrap();
        assert_eq!(label, 2);
        assert_eq!(img[[0, 0, 0]], 7.0);
        assert!(ds.get(4).is_err());

        let sub = ds.subset(&[2, 3]).unwrap();
        assert_eq!(sub.labels(), &[2, 1]);
        assert_eq!(sub.images()[[0, 0, 0, 0]], 7.0);
        assert!(ds.subset(&[0, 9]).is_err());
    }

    #[test]
    fn test_numbered_classes() {
        let ds = ImageDataset::with_numbered_classes(Array4::zeros((3, 3, 2, 2)), vec![0, 4, 2]).unwrap();
        assert_eq!(ds.n_classes(), 5);
        assert_eq!(ds.class_names()[4], "4");
    }
}
