//! Evaluation CLI Tool
//!
//! Loads a saved model directory and reports its loss and metrics on the
//! test split of a dataset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dogbreed_core::{setup_cli_logging, MetricKind};
use dogbreed_dataset::{load, prepare};
use dogbreed_training::{default_device, evaluate_and_report, load_model, TrainingBackend};
use tracing::{info, warn};

/// Dog Breed Model Evaluation Tool
#[derive(Parser, Debug)]
#[command(
    name = "evaluate",
    about = "Evaluate a saved dog breed classifier",
    long_about = "Evaluate a model saved under trained_models/ on the test split and print \
                  each metric with two decimals."
)]
struct Args {
    /// Saved model directory (e.g. trained_models/mobilenet_1)
    #[arg(short, long, value_name = "DIR")]
    model: PathBuf,

    /// Dataset directory containing test/
    #[arg(short, long, value_name = "DIR", default_value = "data/stanford_dogs")]
    data_dir: PathBuf,

    /// Batch size for evaluation
    #[arg(short, long, default_value = "32")]
    batch_size: usize,

    /// Also report top-k accuracy
    #[arg(long, value_name = "K")]
    top_k: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_cli_logging(args.verbose)?;

    info!("Dog Breed Classification - Evaluation Tool");
    info!("==========================================");

    if args.batch_size == 0 {
        anyhow::bail!("Batch size must be greater than 0");
    }

    let device = default_device();
    let mut compiled = load_model::<TrainingBackend>(&args.model, &device)
        .with_context(|| format!("Failed to load model from {}", args.model.display()))?;
    info!(
        "Model: {} ({} classes, {} parameters)",
        compiled.architecture,
        compiled.num_classes,
        compiled.num_params()
    );

    if let Some(k) = args.top_k {
        if k == 0 {
            anyhow::bail!("top-k needs k > 0");
        }
        let metric = MetricKind::TopKAccuracy(k);
        if !compiled.metrics.contains(&metric) {
            compiled.metrics.push(metric);
        }
    }

    let (_, test, metadata) = load(&args.data_dir).context("Failed to load dataset")?;
    if metadata.num_classes() != compiled.num_classes {
        warn!(
            "Dataset has {} classes, model outputs {}",
            metadata.num_classes(),
            compiled.num_classes
        );
    }

    let test = prepare(test, compiled.input_shape, compiled.num_classes, args.batch_size)
        .context("Failed to prepare test split")?;

    println!("{}", "Evaluation Results:".cyan().bold());
    evaluate_and_report(&compiled, &test).context("Evaluation failed")?;

    Ok(())
}
