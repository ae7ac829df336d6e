//! Dataloader producing image batches.

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::dataset::ImageDataset;
use crate::error::{DataError, Result};
use cnnlens_core::{ImageBatch, Normalization};

/// A dataloader that produces batches of images and labels.
///
/// Supports shuffling with a deterministic seed, dropping the last partial
/// batch, and normalizing images as they are batched.
///
/// # Example
///
/// ```rust,ignore
/// use cnnlens_data::{ImageDataset, ImageDataLoader};
/// use cnnlens_core::Normalization;
///
/// let loader = ImageDataLoader::builder(dataset)
///     .batch_size(128)
///     .normalization(Normalization::CIFAR10)
///     .build()?;
///
/// for batch in loader.iter::<NdArray>(&device) {
///     let batch = batch?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ImageDataLoader {
    dataset: ImageDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
    normalization: Option<Normalization>,
}

impl ImageDataLoader {
    /// Create a new dataloader builder.
    #[must_use]
    pub fn builder(dataset: ImageDataset) -> ImageDataLoaderBuilder {
        ImageDataLoaderBuilder::new(dataset)
    }

    /// Get the dataset.
    #[must_use]
    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Normalization applied to each batch, if any.
    #[must_use]
    pub fn normalization(&self) -> Option<Normalization> {
        self.normalization
    }

    /// Class names of the underlying dataset.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        self.dataset.class_names()
    }

    /// Get the number of batches.
    #[must_use]
    pub fn n_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Get the total number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Check if the loader is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Sample indices in the order batches visit them, already truncated
    /// when `drop_last` is set.
    #[must_use]
    pub fn sample_order(&self) -> Vec<usize> {
        let n = self.dataset.len();
        let mut indices: Vec<usize> = (0..n).collect();

        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        if self.drop_last {
            indices.truncate(self.n_batches() * self.batch_size);
        }
        indices
    }

    /// Labels grouped by batch, without materializing any tensors.
    pub fn label_batches(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        let labels = self.dataset.labels();
        let order = self.sample_order();
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(|chunk| chunk.iter().map(|&i| labels[i]).collect())
            .collect();
        chunks.into_iter()
    }

    /// Create an iterator over batches.
    ///
    /// # Type Parameters
    ///
    /// * `B` - The Burn backend to use for tensors
    #[must_use]
    pub fn iter<B: Backend>(&self, device: &B::Device) -> ImageDataLoaderIter<'_, B> {
        ImageDataLoaderIter::new(self, device.clone())
    }
}

/// Builder for [`ImageDataLoader`].
pub struct ImageDataLoaderBuilder {
    dataset: ImageDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
    normalization: Option<Normalization>,
}

impl ImageDataLoaderBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(dataset: ImageDataset) -> Self {
        Self {
            dataset,
            batch_size: 128,
            shuffle: false,
            drop_last: false,
            seed: None,
            normalization: None,
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable dropping the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the random seed for shuffling.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Normalize every batch with these statistics.
    #[must_use]
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = Some(normalization);
        self
    }

    /// Build the dataloader.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch size is zero or the dataset is empty.
    pub fn build(self) -> Result<ImageDataLoader> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.dataset.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        Ok(ImageDataLoader {
            dataset: self.dataset,
            batch_size: self.batch_size,
            shuffle: self.shuffle,
            drop_last: self.drop_last,
            seed: self.seed,
            normalization: self.normalization,
        })
    }
}

/// Iterator over batches from an [`ImageDataLoader`].
pub struct ImageDataLoaderIter<'a, B: Backend> {
    loader: &'a ImageDataLoader,
    device: B::Device,
    indices: Vec<usize>,
    current_batch: usize,
    n_batches: usize,
}

impl<'a, B: Backend> ImageDataLoaderIter<'a, B> {
    fn new(loader: &'a ImageDataLoader, device: B::Device) -> Self {
        Self {
            loader,
            device,
            indices: loader.sample_order(),
            current_batch: 0,
            n_batches: loader.n_batches(),
        }
    }

    fn create_batch(&self, indices: &[usize]) -> Result<ImageBatch<B>> {
        let dataset = &self.loader.dataset;
        let batch_size = indices.len();
        let shape = dataset.image_shape();

        let mut pixels = Vec::with_capacity(batch_size * shape.numel());
        let mut labels = Vec::with_capacity(batch_size);
        for &idx in indices {
            let (image, label) = dataset.get(idx)?;
            pixels.extend(image.iter().copied());
            labels.push(label as i64);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, shape.with_batch(batch_size)),
            &self.device,
        );
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), &self.device);

        let batch = ImageBatch::new(images, targets)?;
        match &self.loader.normalization {
            Some(norm) => Ok(batch.normalized(norm)?),
            None => Ok(batch),
        }
    }
}

impl<B: Backend> Iterator for ImageDataLoaderIter<'_, B> {
    type Item = Result<ImageBatch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_batch >= self.n_batches {
            return None;
        }

        let start = self.current_batch * self.loader.batch_size;
        let end = std::cmp::min(start + self.loader.batch_size, self.indices.len());
        self.current_batch += 1;

        Some(self.create_batch(&self.indices[start..end]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_batches - self.current_batch;
        (remaining, Some(remaining))
    }
}

impl<B: Backend> ExactSizeIterator for ImageDataLoaderIter<'_, B> {}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use cnnlens_core::float_tensor_to_vec;
    use ndarray::Array4;

    type TestBackend = NdArray;

    fn create_test_dataset(n: usize) -> ImageDataset {
        let images = Array4::from_shape_fn((n, 3, 4, 4), |(i, _, _, _)| i as f32);
        let labels = (0..n).map(|i| i % 3).collect();
        let names = vec!["cat".to_string(), "dog".to_string(), "frog".to_string()];
        ImageDataset::new(images, labels, names).unwrap()
    }

    #[test]
    fn test_loader_builder() {
        let loader = ImageDataLoader::builder(create_test_dataset(100))
            .batch_size(32)
            .shuffle(true)
            .build()
            .unwrap();

        assert_eq!(loader.batch_size(), 32);
        assert_eq!(loader.n_batches(), 4); // ceil(100/32) = 4
    }

    #[test]
    fn test_loader_n_batches() {
        let ds = create_test_dataset(100);

        let loader = ImageDataLoader::builder(ds.clone())
            .batch_size(32)
            .drop_last(false)
            .build()
            .unwrap();
        assert_eq!(loader.n_batches(), 4);

        let loader = ImageDataLoader::builder(ds)
            .batch_size(32)
            .drop_last(true)
            .build()
            .unwrap();
        assert_eq!(loader.n_batches(), 3);
        assert_eq!(loader.sample_order().len(), 96);
    }

    #[test]
    fn test_loader_rejects_bad_config() {
        assert!(ImageDataLoader::builder(create_test_dataset(4))
            .batch_size(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_iter_yields_images_and_labels_in_order() {
        let device = Default::default();
        let loader = ImageDataLoader::builder(create_test_dataset(5))
            .batch_size(2)
            .build()
            .unwrap();

        let batches: Vec<_> = loader
            .iter::<TestBackend>(&device)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].images.dims(), [2, 3, 4, 4]);
        assert_eq!(batches[2].batch_size(), 1);
        assert_eq!(batches[1].target_indices().unwrap(), vec![2, 0]);

        // Image i is filled with the value i.
        let last = float_tensor_to_vec(batches[2].images.clone());
        assert!(last.iter().all(|&v| v == 4.0));
    }

    #[test]
    fn test_seeded_shuffle_is_deterministic() {
        let build = || {
            ImageDataLoader::builder(create_test_dataset(50))
                .batch_size(8)
                .shuffle(true)
                .seed(42)
                .build()
                .unwrap()
        };
        assert_eq!(build().sample_order(), build().sample_order());
        assert_ne!(build().sample_order(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_normalization_applied_to_batches() {
        let device = Default::default();
        let loader = ImageDataLoader::builder(create_test_dataset(2))
            .batch_size(2)
            .normalization(Normalization::CIFAR10)
            .build()
            .unwrap();

        let batch = loader.iter::<TestBackend>(&device).next().unwrap().unwrap();
        let values = float_tensor_to_vec(batch.images);
        let norm = Normalization::CIFAR10;
        // First value is image 0, channel 0.
        assert!((values[0] - norm.normalize_value(0, 0.0)).abs() < 1e-6);
    }

    #[test]
    fn test_label_batches() {
        let loader = ImageDataLoader::builder(create_test_dataset(5))
            .batch_size(2)
            .build()
            .unwrap();
        let batches: Vec<_> = loader.label_batches().collect();
        assert_eq!(batches, vec![vec![0, 1], vec![2, 0], vec![1]]);
    }
}
