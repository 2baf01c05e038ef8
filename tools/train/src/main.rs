//! Training CLI Tool
//!
//! Runs the full pipeline: model selection, training with per-epoch
//! validation, optional evaluation and saving the final model. With no
//! arguments it trains MobileNet with the default configuration and seed 0.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dogbreed_core::{load_toml_config, setup_cli_logging, Architecture, RunConfig, RunContext};
use dogbreed_training::{backend_name, default_device, pipeline, TrainingBackend};
use tracing::info;

/// Dog Breed Classification Training Tool
#[derive(Parser, Debug)]
#[command(
    name = "train",
    about = "Train a dog breed classifier",
    long_about = "Train a transfer-learning dog breed classifier (alexnet, vgg16, resnet50 or \
                  mobilenet) on a class-per-directory dataset with train/ and test/ splits."
)]
struct Args {
    /// Path to run configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Architecture: alexnet, vgg16, resnet50 or mobilenet
    #[arg(short, long, value_name = "NAME")]
    architecture: Option<String>,

    /// Override number of epochs
    #[arg(short, long, value_name = "N")]
    epochs: Option<usize>,

    /// Override batch size
    #[arg(short, long, value_name = "SIZE")]
    batch_size: Option<usize>,

    /// Override dataset directory
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Override the base directory for checkpoints, logs and saved models
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Evaluate on the test split after training
    #[arg(long)]
    evaluate: bool,

    /// Saved model directory to warm-start from
    #[arg(long, value_name = "DIR")]
    pretrained: Option<PathBuf>,

    /// Only train the classification head
    #[arg(long)]
    freeze_backbone: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Dry run (validate config without training)
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    setup_cli_logging(args.verbose)?;

    info!("Dog Breed Classification - Training Tool");
    info!("========================================");

    let mut config = match &args.config {
        Some(path) => load_toml_config(path).context("Failed to load configuration file")?,
        None => RunConfig::default(),
    };

    apply_overrides(&mut config, &args)?;

    let ctx = RunContext::new(config).context("Invalid configuration")?;
    print_config_summary(&ctx);

    if args.dry_run {
        info!("Configuration validated successfully (dry run)");
        return Ok(());
    }

    let device = default_device();
    let outcome = pipeline::run_from_disk::<TrainingBackend>(&ctx, &device)
        .context("Training run failed")?;

    println!();
    println!("{}", "Training Complete!".green().bold());
    if let (Some(best), Some(epoch)) = (
        outcome.history.best_val_accuracy(),
        outcome.history.best_epoch(),
    ) {
        println!("  Best validation accuracy: {:.2}% (epoch {})", best * 100.0, epoch);
    }
    println!("  Model: {}", outcome.save_dir.display());
    println!("  Checkpoint: {}", ctx.paths.checkpoint_file.display());
    println!("  Logs: {}", ctx.paths.log_dir.display());

    Ok(())
}

fn apply_overrides(config: &mut RunConfig, args: &Args) -> Result<()> {
    if let Some(name) = &args.architecture {
        config.model.architecture = name.parse::<Architecture>()?;
    }
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.training.batch_size = batch_size;
    }
    if let Some(data_dir) = &args.data_dir {
        config.data.data_dir = data_dir.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output.base_dir = output_dir.clone();
    }
    if let Some(pretrained) = &args.pretrained {
        config.model.pretrained = Some(pretrained.clone());
    }
    config.training.evaluate |= args.evaluate;
    config.model.freeze_backbone |= args.freeze_backbone;
    Ok(())
}

fn print_config_summary(ctx: &RunContext) {
    let config = &ctx.config;
    info!("");
    info!("Configuration Summary:");
    info!("  Run id: {}", ctx.run_id);
    info!("  Backend: {}", backend_name());
    info!("  Model: {}", config.model.architecture);
    info!("  Learning rate: {}", config.model.architecture.learning_rate());
    info!("  Input shape: {}", config.model.input_shape);
    info!("  Classes: {}", config.model.num_classes);
    info!("  Epochs: {}", config.training.epochs);
    info!("  Batch size: {}", config.training.batch_size);
    info!("  Seed: {}", config.training.seed);
    info!("  Data dir: {}", config.data.data_dir.display());
    info!("  Checkpoints: {}", ctx.paths.checkpoint_dir.display());
    info!("  Logs: {}", ctx.paths.log_dir.display());
    info!("  Saved model: {}", ctx.paths.save_dir.display());
    if let Some(pretrained) = &config.model.pretrained {
        info!("  Pretrained: {}", pretrained.display());
    }
    info!("");
}
