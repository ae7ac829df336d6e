//! Integration tests for the inspection pipeline.
//!
//! These tests run the full flows on synthetic CIFAR-like data with a small
//! `CifarNet` and with a stub classifier whose logits are fixed by the input.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use ndarray::Array4;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use cnnlens::analysis::{AnalysisError, summarize_layers};
use cnnlens::core::int_tensor_to_indices;
use cnnlens::prelude::*;

type EvalBackend = NdArray;
type GradBackend = Autodiff<NdArray>;

const N_CLASSES: usize = 4;
const SIZE: usize = 8;

/// Random images in [0, 1].
fn synthetic_images(n_samples: usize) -> Array4<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let data: Vec<f32> = (0..n_samples * 3 * SIZE * SIZE).map(|_| rng.gen::<f32>()).collect();
    Array4::from_shape_vec((n_samples, 3, SIZE, SIZE), data).unwrap()
}

fn class_names() -> Vec<String> {
    (0..N_CLASSES).map(|i| format!("class{i}")).collect()
}

fn small_model() -> CifarNet<GradBackend> {
    CifarNetConfig::new(N_CLASSES)
        .with_channels([4, 8, 8, 16])
        .init::<GradBackend>(&Default::default())
}

fn loader_for(images: Array4<f32>, labels: Vec<usize>) -> ImageDataLoader {
    let dataset = ImageDataset::new(images, labels, class_names()).unwrap();
    ImageDataLoader::builder(dataset)
        .batch_size(5)
        .normalization(Normalization::CIFAR10)
        .build()
        .unwrap()
}

/// A loader whose every label differs from the model's prediction.
fn all_wrong_loader(model: &CifarNet<GradBackend>, n_samples: usize) -> ImageDataLoader {
    let images = synthetic_images(n_samples);
    let probe = loader_for(images.clone(), vec![0; n_samples]);
    let eval = model.valid();
    let device = Default::default();

    let mut preds = Vec::new();
    for batch in probe.iter::<EvalBackend>(&device) {
        let batch = batch.unwrap();
        let n = batch.batch_size();
        let logits = eval.forward(batch.images);
        preds.extend(int_tensor_to_indices(logits.argmax(1).reshape([n])).unwrap());
    }

    let labels = preds.iter().map(|p| (p + 1) % N_CLASSES).collect();
    loader_for(images, labels)
}

#[test]
fn test_incorrect_predictions_on_cifar_net() {
    let model = small_model();
    let loader = all_wrong_loader(&model, 12);
    let device = Default::default();

    let incorrect =
        find_incorrect_predictions::<EvalBackend, _>(&model.valid(), &loader, &device).unwrap();

    assert_eq!(incorrect.len(), 12);
    assert_eq!(incorrect.predictions.len(), incorrect.labels.len());
    assert_eq!(incorrect.examples.len(), incorrect.labels.len());
    assert!(incorrect
        .predictions
        .iter()
        .zip(&incorrect.labels)
        .all(|(p, l)| p != l));
}

#[test]
fn test_misclassified_images_recover_raw_pixels() {
    let model = small_model();
    let loader = all_wrong_loader(&model, 6);
    let device = Default::default();
    let raw = loader.dataset().images().clone();

    let images = misclassified_images::<EvalBackend, _>(
        &model.valid(),
        &loader,
        &device,
        3,
        &Normalization::CIFAR10,
    )
    .unwrap();

    assert_eq!(images.len(), 3);
    for (i, image) in images.iter().enumerate() {
        assert_eq!((image.height(), image.width(), image.channels()), (SIZE, SIZE, 3));
        for y in 0..SIZE {
            for x in 0..SIZE {
                for c in 0..3 {
                    assert!((image.get(y, x, c) - raw[[i, c, y, x]]).abs() < 1e-5);
                }
            }
        }
    }
}

#[test]
fn test_requesting_too_many_fails() {
    let model = small_model();
    let loader = all_wrong_loader(&model, 4);

    let result = misclassified_images::<EvalBackend, _>(
        &model.valid(),
        &loader,
        &Default::default(),
        5,
        &Normalization::CIFAR10,
    );
    assert!(matches!(
        result,
        Err(AnalysisError::NotEnoughMisclassified {
            requested: 5,
            found: 4
        })
    ));
}

#[test]
fn test_grad_cam_images() {
    let model = small_model();
    let loader = all_wrong_loader(&model, 4);

    let overlays = grad_cam_images::<GradBackend, _>(
        &model,
        &loader,
        &Default::default(),
        2,
        TargetLayer::Block4,
        0.725,
        &Normalization::CIFAR10,
    )
    .unwrap();

    assert_eq!(overlays.len(), 2);
    for overlay in &overlays {
        assert_eq!(overlay.dimensions(), (SIZE as u32, SIZE as u32));
    }
}

#[test]
fn test_plots_and_save() {
    let model = small_model();
    let loader = all_wrong_loader(&model, 8);
    let device = Default::default();
    let names = class_names();

    let config = PlotConfig::default().with_grid(2, 3);
    let figure =
        plot_misclassified::<EvalBackend, _>(&model.valid(), &loader, &device, &names, &config)
            .unwrap();
    assert_eq!(figure.titles().len(), 6);
    assert!(figure.titles().iter().all(|t| t.contains('/')));
    assert!(figure.caption_height() > 0);

    let config = PlotConfig::default().with_grid(1, 2).with_layer(2);
    let figure = plot_grad_cam::<GradBackend, _>(&model, &loader, &device, &names, &config).unwrap();
    assert_eq!(figure.titles().len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradcam.png");
    figure.save(&path).unwrap();
    let loaded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(loaded.dimensions(), figure.image().dimensions());
}

#[test]
fn test_plot_grad_cam_rejects_bad_layer() {
    let model = small_model();
    let loader = all_wrong_loader(&model, 4);
    let config = PlotConfig::default().with_grid(1, 1).with_layer(0);

    let result =
        plot_grad_cam::<GradBackend, _>(&model, &loader, &Default::default(), &class_names(), &config);
    assert!(result.is_err());
}

#[test]
fn test_cifar_net_summary() {
    let model = CifarNetConfig::new(10).init::<EvalBackend>(&Default::default());
    let summary = model_summary(&model, [1, 3, 32, 32]).unwrap();

    // convs (no bias) + batch norms + linear head
    let convs = 3 * 32 * 9 + 32 * 64 * 9 + 64 * 128 * 9 + 128 * 256 * 9;
    let norms = 2 * (32 + 64 + 128 + 256);
    let head = 256 * 10 + 10;
    assert_eq!(summary.total_params(), convs + norms + head);
    assert_eq!(summary.output_shape(), vec![1, 10]);
    assert_eq!(summary.layers[0].mult_adds, 864 * 32 * 32);

    let block4 = summary
        .layers
        .iter()
        .find(|l| l.name == "convblock4.conv")
        .unwrap();
    assert_eq!(block4.output_shape, vec![1, 256, 8, 8]);

    // Too small for the pooling blocks.
    assert!(summarize_layers(&model.layers(), [1, 3, 1, 1]).is_err());
}

/// Predicts the class whose index is closest to the image's mean value.
struct FixedLogits;

impl<B: Backend> ImageClassifier<B> for FixedLogits {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let [n, c, h, w] = x.dims();
        let mean = x.reshape([n, c * h * w]).mean_dim(1);
        let classes = Tensor::<B, 1, Int>::arange(0..N_CLASSES as i64, &mean.device())
            .float()
            .reshape([1, N_CLASSES]);
        (mean - classes).abs().neg()
    }

    fn n_classes(&self) -> usize {
        N_CLASSES
    }
}

#[test]
fn test_stub_classifier_flow() {
    let n = 16;
    let mut images = Array4::<f32>::zeros((n, 3, 2, 2));
    let mut labels = Vec::new();
    for i in 0..n {
        let predicted = i % N_CLASSES;
        images.slice_mut(ndarray::s![i, .., .., ..]).fill(predicted as f32);
        // Every fourth sample is labelled correctly.
        labels.push(if i % 4 == 0 { predicted } else { (predicted + 1) % N_CLASSES });
    }
    let dataset = ImageDataset::new(images, labels, class_names()).unwrap();
    let loader = ImageDataLoader::builder(dataset).batch_size(16).build().unwrap();

    let incorrect =
        find_incorrect_predictions::<EvalBackend, _>(&FixedLogits, &loader, &Default::default())
            .unwrap();
    assert_eq!(incorrect.len(), 12);
    assert_eq!(incorrect.captions(loader.class_names())[0], "class1/class2");

    let stats = class_distribution(&loader);
    assert_eq!(stats.total(), 16);

    let grid = sample_grid(&loader, 8, 1).unwrap();
    assert_eq!(grid.titles().len(), 8);
}

#[test]
fn test_training_history_reports() {
    let mut history = TrainingHistory::new();
    for epoch in 0..3 {
        let e = f64::from(epoch);
        history.push_epoch(1.5 - 0.4 * e, 1.4 - 0.3 * e, 0.5 + 0.1 * e, 0.55 + 0.08 * e, 0.05);
    }

    let log = history.format_train_log(3).unwrap();
    assert!(log.contains("3\t\t0.70\t\t0.80\t\t0.7000\t\t0.7100\t\t0.05000000"));
    assert!(history.format_train_log(4).is_err());

    let chart = plot_network_performance(&history);
    assert_eq!(chart.panels().len(), 4);
    assert!(chart.to_string().contains("Test Accuracy"));
}
