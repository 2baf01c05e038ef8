//! End-to-end run: setup, model selection, training, evaluation and save.

use std::path::PathBuf;

use burn::tensor::backend::{AutodiffBackend, Backend};
use colored::Colorize;
use dogbreed_core::{History, MetricsReport, Result, RunContext};
use dogbreed_dataset::{load, prepare, DogBreedDataset};
use tracing::{debug, info, warn};

use crate::checkpoint::{save_model, SavedModelInfo};
use crate::evaluator;
use crate::factory::select_model;
use crate::trainer;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub history: History,
    pub evaluation: Option<MetricsReport>,
    pub saved: SavedModelInfo,
    pub save_dir: PathBuf,
}

/// Runs the pipeline on already loaded splits.
///
/// The test split doubles as per-epoch validation data and, when enabled,
/// as the evaluation split.
pub fn run<B: AutodiffBackend>(
    ctx: &RunContext,
    train: DogBreedDataset,
    test: DogBreedDataset,
    device: &B::Device,
) -> Result<RunOutcome> {
    let config = &ctx.config;
    <B as Backend>::seed(config.training.seed);

    let shape = config.model.input_shape;
    let num_classes = config.model.num_classes;
    let batch_size = config.training.batch_size;
    let train = prepare(train, shape, num_classes, batch_size)?;
    let test = prepare(test, shape, num_classes, batch_size)?;

    let mut compiled = select_model::<B>(config.model.architecture.name(), ctx, device)?;
    println!("{}", compiled.summary());
    println!();

    println!("{}", "Starting Training...".green().bold());
    let history = trainer::fit(&mut compiled, &train, &test, ctx, device)?;

    let evaluation = if config.training.evaluate {
        println!("{}", "Evaluating...".cyan());
        Some(evaluator::evaluate_and_report(&compiled, &test)?)
    } else {
        None
    };

    let saved = save_model(&compiled, &ctx.paths.save_dir, Some(ctx))?;
    println!("  Saved to: {:?}", ctx.paths.save_dir);

    Ok(RunOutcome {
        history,
        evaluation,
        saved,
        save_dir: ctx.paths.save_dir.clone(),
    })
}

/// Loads the dataset named by the run configuration and runs the pipeline
pub fn run_from_disk<B: AutodiffBackend>(ctx: &RunContext, device: &B::Device) -> Result<RunOutcome> {
    let (train, test, metadata) = load(&ctx.config.data.data_dir)?;

    if metadata.num_classes() != ctx.config.model.num_classes {
        warn!(
            "Dataset has {} classes, model is configured for {}",
            metadata.num_classes(),
            ctx.config.model.num_classes
        );
    }
    info!(
        "Run {}: {} train / {} test examples",
        ctx.run_id,
        metadata.train_examples,
        metadata.test_examples
    );
    for (label, count) in train.class_distribution().iter().enumerate() {
        debug!(
            "  {:>3} {:<30} {} train examples",
            label,
            metadata.breed(label).unwrap_or("?"),
            count
        );
    }

    run::<B>(ctx, train, test, device)
}
