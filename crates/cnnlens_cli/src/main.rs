//! cnnlens CLI for inspecting trained CNN image classifiers.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burn::prelude::*;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use cnnlens_analysis::{print_model_summary, print_train_log, TrainingHistory};
use cnnlens_data::{cifar10_class_names, print_data_stats, read_images_npy, read_labels_npy};
use cnnlens_data::{ImageDataLoader, ImageDataset};
use cnnlens_models::{load_checkpoint, CifarNet, CifarNetConfig};
use cnnlens_render::{
    plot_grad_cam, plot_misclassified, plot_network_performance, sample_grid, Figure, PlotConfig,
};

/// Backend used for Grad-CAM, which needs gradients.
type CamBackend = Autodiff<NdArray>;

#[derive(Parser)]
#[command(name = "cnnlens")]
#[command(author, version)]
#[command(about = "Inspect CNN image classifiers - misclassifications, Grad-CAM, logs and summaries")]
#[command(long_about = "cnnlens: visualization helpers for convolutional image classifiers.

Images are read from a (N, C, H, W) .npy array and labels from a 1D .npy array.
Checkpoints are burn .mpk weights with a .json metadata sidecar.

EXAMPLES:
  # Print the layer table of the default network
  cnnlens summary --input-size 1,3,32,32

  # Print a training log from a history file
  cnnlens train-log --history history.json

  # Plot 15 misclassified test images
  cnnlens misclassified --checkpoint model.mpk --images x.npy --labels y.npy -o wrong.png

  # Grad-CAM on the second deepest block
  cnnlens gradcam --checkpoint model.mpk --images x.npy --labels y.npy --layer 2 -o cam.png")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON file with plot, model and loader settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a torchinfo-style layer table
    Summary {
        /// Checkpoint to summarize (defaults to the configured network)
        #[arg(long, value_name = "FILE")]
        checkpoint: Option<PathBuf>,

        /// Input size as batch,channels,height,width
        #[arg(long, value_delimiter = ',', default_value = "1,3,32,32")]
        input_size: Vec<usize>,
    },
    /// Print the per-epoch training log
    TrainLog {
        /// Training history JSON
        #[arg(long, value_name = "FILE")]
        history: PathBuf,

        /// Number of epochs to print (defaults to all)
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Draw loss and accuracy curves
    Performance {
        /// Training history JSON
        #[arg(long, value_name = "FILE")]
        history: PathBuf,
    },
    /// Count labels per class
    Stats {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Save a grid of sample images from the first batch
    Samples {
        #[command(flatten)]
        data: DataArgs,

        /// Number of images, a multiple of 8
        #[arg(long, default_value = "16")]
        count: usize,

        /// Shuffle with this seed before taking the first batch
        #[arg(long)]
        seed: Option<u64>,

        /// Output PNG
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Save a grid of misclassified images
    Misclassified {
        #[command(flatten)]
        eval: EvalArgs,
    },
    /// Save a grid of Grad-CAM overlays on misclassified images
    Gradcam {
        #[command(flatten)]
        eval: EvalArgs,

        /// Target block: 1 is the deepest, 4 the first
        #[arg(long)]
        layer: Option<usize>,

        /// Image weight when blending the heatmap
        #[arg(long)]
        transparency: Option<f32>,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Images .npy of shape (N, C, H, W)
    #[arg(long, value_name = "FILE")]
    images: PathBuf,

    /// Labels .npy of shape (N,)
    #[arg(long, value_name = "FILE")]
    labels: PathBuf,
}

#[derive(Args)]
struct EvalArgs {
    /// Model checkpoint (.mpk with a .json sidecar)
    #[arg(long, value_name = "FILE")]
    checkpoint: PathBuf,

    #[command(flatten)]
    data: DataArgs,

    /// Grid rows
    #[arg(long)]
    rows: Option<usize>,

    /// Grid columns
    #[arg(long)]
    columns: Option<usize>,

    /// Output PNG
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
}

/// Settings read from `--config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CliConfig {
    plot: PlotConfig,
    model: CifarNetConfig,
    batch_size: usize,
    class_names: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            plot: PlotConfig::default(),
            model: CifarNetConfig::default(),
            batch_size: 128,
            class_names: cifar10_class_names(),
        }
    }
}

impl CliConfig {
    fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .context(format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&json).context(format!("Failed to parse config {}", path.display()))
    }

    /// Plot settings with command-line overrides applied.
    fn plot_with(&self, rows: Option<usize>, columns: Option<usize>) -> PlotConfig {
        let plot = self.plot.clone();
        let (r, c) = (rows.unwrap_or(plot.rows), columns.unwrap_or(plot.columns));
        plot.with_grid(r, c)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Summary {
            checkpoint,
            input_size,
        } => handle_summary(&config, checkpoint, &input_size),
        Commands::TrainLog { history, epochs } => handle_train_log(&history, epochs),
        Commands::Performance { history } => handle_performance(&history),
        Commands::Stats { data } => handle_stats(&config, &data),
        Commands::Samples {
            data,
            count,
            seed,
            output,
        } => handle_samples(&config, &data, count, seed, &output),
        Commands::Misclassified { eval } => handle_misclassified(&config, &eval),
        Commands::Gradcam {
            eval,
            layer,
            transparency,
        } => handle_gradcam(&config, &eval, layer, transparency),
    }
}

fn handle_summary(
    config: &CliConfig,
    checkpoint: Option<PathBuf>,
    input_size: &[usize],
) -> Result<()> {
    let input_size: [usize; 4] = match input_size {
        &[b, c, h, w] => [b, c, h, w],
        other => bail!("--input-size needs 4 values (batch,channels,height,width), got {}", other.len()),
    };

    let device = <NdArray as Backend>::Device::default();
    let model: CifarNet<NdArray> = match checkpoint {
        Some(path) => load_network(&path, &device)?,
        None => config.model.init(&device),
    };

    print_model_summary(&model, input_size).context("Failed to summarize model")?;
    Ok(())
}

fn handle_train_log(path: &Path, epochs: Option<usize>) -> Result<()> {
    let history = load_history(path)?;
    let epochs = epochs.unwrap_or_else(|| history.len());
    print_train_log(&history, epochs)?;
    Ok(())
}

fn handle_performance(path: &Path) -> Result<()> {
    let history = load_history(path)?;
    if history.is_empty() {
        bail!("History {} has no complete epochs", path.display());
    }
    println!("{}", plot_network_performance(&history));
    Ok(())
}

fn handle_stats(config: &CliConfig, data: &DataArgs) -> Result<()> {
    let loader = build_loader(config, data, None)?;
    print_data_stats(&loader);
    Ok(())
}

fn handle_samples(
    config: &CliConfig,
    data: &DataArgs,
    count: usize,
    seed: Option<u64>,
    output: &Path,
) -> Result<()> {
    let loader = build_loader(config, data, seed)?;
    let figure = sample_grid(&loader, count, config.plot.tile_scale)?;
    save_figure(&figure, output)
}

fn handle_misclassified(config: &CliConfig, eval: &EvalArgs) -> Result<()> {
    let plot = config.plot_with(eval.rows, eval.columns);
    let loader = build_loader(config, &eval.data, None)?;

    let device = <NdArray as Backend>::Device::default();
    let model: CifarNet<NdArray> = load_network(&eval.checkpoint, &device)?;

    let figure = plot_misclassified(&model, &loader, &device, &config.class_names, &plot)?;
    save_figure(&figure, &eval.output)
}

fn handle_gradcam(
    config: &CliConfig,
    eval: &EvalArgs,
    layer: Option<usize>,
    transparency: Option<f32>,
) -> Result<()> {
    let mut plot = config.plot_with(eval.rows, eval.columns);
    if let Some(layer) = layer {
        plot = plot.with_layer(layer);
    }
    if let Some(transparency) = transparency {
        plot = plot.with_transparency(transparency);
    }
    let loader = build_loader(config, &eval.data, None)?;

    let device = <CamBackend as Backend>::Device::default();
    let model: CifarNet<CamBackend> = load_network(&eval.checkpoint, &device)?;
    info!(layer = plot.layer, transparency = plot.transparency, "running grad-cam");

    let figure = plot_grad_cam::<CamBackend, _>(
        &model,
        &loader,
        &device,
        &config.class_names,
        &plot,
    )?;
    save_figure(&figure, &eval.output)
}

fn load_network<B: Backend>(path: &Path, device: &B::Device) -> Result<CifarNet<B>> {
    let (model, metadata) = load_checkpoint::<B>(path, device)
        .context(format!("Failed to load checkpoint {}", path.display()))?;
    info!(
        path = %path.display(),
        epoch = ?metadata.epoch,
        test_acc = ?metadata.test_acc,
        "loaded checkpoint"
    );
    Ok(model)
}

fn load_history(path: &Path) -> Result<TrainingHistory> {
    TrainingHistory::load(path).context(format!("Failed to load history {}", path.display()))
}

/// Read the arrays and wrap them in a loader that normalizes with the plot
/// statistics.
fn build_loader(config: &CliConfig, data: &DataArgs, seed: Option<u64>) -> Result<ImageDataLoader> {
    let images = read_images_npy(&data.images)
        .context(format!("Failed to read images {}", data.images.display()))?;
    let labels = read_labels_npy(&data.labels)
        .context(format!("Failed to read labels {}", data.labels.display()))?;

    let dataset = ImageDataset::new(images, labels, config.class_names.clone())
        .context("Images, labels and class names do not agree")?;
    info!(
        samples = dataset.len(),
        shape = %dataset.image_shape(),
        classes = dataset.n_classes(),
        "loaded dataset"
    );

    let mut builder = ImageDataLoader::builder(dataset)
        .batch_size(config.batch_size)
        .normalization(config.plot.normalization);
    if let Some(seed) = seed {
        builder = builder.shuffle(true).seed(seed);
    }
    Ok(builder.build()?)
}

fn save_figure(figure: &Figure, output: &Path) -> Result<()> {
    figure
        .save(output)
        .context(format!("Failed to save figure {}", output.display()))?;
    print!("{figure}");
    println!("Saved {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_gradcam_overrides() {
        let cli = Cli::try_parse_from([
            "cnnlens",
            "gradcam",
            "--checkpoint",
            "m.mpk",
            "--images",
            "x.npy",
            "--labels",
            "y.npy",
            "--layer",
            "3",
            "--rows",
            "2",
            "-o",
            "cam.png",
        ])
        .unwrap();

        match cli.command {
            Commands::Gradcam {
                eval,
                layer,
                transparency,
            } => {
                assert_eq!(layer, Some(3));
                assert_eq!(transparency, None);
                assert_eq!(eval.rows, Some(2));
                assert_eq!(eval.columns, None);
                assert_eq!(eval.output, PathBuf::from("cam.png"));
            }
            _ => panic!("expected gradcam"),
        }
    }

    #[test]
    fn test_parse_input_size() {
        let cli = Cli::try_parse_from(["cnnlens", "summary", "--input-size", "2,3,64,64"]).unwrap();
        match cli.command {
            Commands::Summary { input_size, .. } => assert_eq!(input_size, vec![2, 3, 64, 64]),
            _ => panic!("expected summary"),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.class_names.len(), 10);
        assert_eq!(config.plot, PlotConfig::default());
    }

    #[test]
    fn test_partial_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cnnlens.json");
        std::fs::write(&path, r#"{"batch_size": 32, "plot": {"rows": 2, "layer": 2}}"#).unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.plot.rows, 2);
        assert_eq!(config.plot.columns, 5);
        assert_eq!(config.plot.layer, 2);
        assert_eq!(config.model, CifarNetConfig::default());

        let plot = config.plot_with(None, Some(4));
        assert_eq!(plot.n_panels(), 8);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }
}
