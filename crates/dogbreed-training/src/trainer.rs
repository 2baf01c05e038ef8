//! Training loop.
//!
//! Runs supervised training with categorical cross-entropy and Adam,
//! validating once per epoch. Each epoch writes summaries and overwrites the
//! run's checkpoint.

use std::time::Instant;

use burn::{
    optim::{GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use dogbreed_core::{EpochMetrics, Error, History, MetricsReport, Result, RunContext, LOSS};
use dogbreed_dataset::PreparedSplit;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::checkpoint::{CheckpointInfo, CheckpointSink};
use crate::evaluator;
use crate::factory::CompiledModel;
use crate::metrics::{categorical_cross_entropy, correct_predictions};
use crate::model::DogBreedClassifier;
use crate::summary::{SummaryWriter, TRAIN, VALIDATION};

/// Progress of a running fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingState {
    pub epoch: usize,
    pub best_val_accuracy: f64,
    pub history: History,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self {
            epoch: 0,
            best_val_accuracy: 0.0,
            history: History::new(),
        }
    }
}

impl TrainingState {
    /// Records a finished epoch; returns whether validation accuracy improved
    pub fn update_epoch(&mut self, metrics: EpochMetrics) -> bool {
        self.epoch = metrics.epoch;
        let val_acc = metrics.validation.accuracy().unwrap_or(0.0);
        let improved = val_acc > self.best_val_accuracy;
        if improved {
            self.best_val_accuracy = val_acc;
        }
        self.history.push(metrics);
        improved
    }
}

fn progress_bar(epoch: usize, epochs: usize, num_batches: usize) -> ProgressBar {
    let bar = ProgressBar::new(num_batches as u64);
    let style = ProgressStyle::with_template(
        "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=>-");
    bar.set_style(style);
    bar.set_prefix(format!("Epoch {epoch}/{epochs}"));
    bar
}

/// Trains `compiled` in place on `train`, validating on `validation` after each epoch
pub fn fit<B: AutodiffBackend>(
    compiled: &mut CompiledModel<B>,
    train: &PreparedSplit,
    validation: &PreparedSplit,
    ctx: &RunContext,
    device: &B::Device,
) -> Result<History> {
    if train.num_examples() == 0 {
        return Err(Error::Training("Training split is empty".to_string()));
    }
    if train.num_classes() != compiled.num_classes {
        return Err(Error::Training(format!(
            "Training split has {} classes but the model outputs {}",
            train.num_classes(),
            compiled.num_classes
        )));
    }

    let params = &ctx.config.training;
    let summaries = SummaryWriter::new(&ctx.paths.log_dir)?;
    let checkpoints = CheckpointSink::new(&ctx.paths);
    let learning_rate = compiled.learning_rate;

    let mut optimizer = compiled.optimizer.init::<B, DogBreedClassifier<B>>();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let batcher = train.batcher::<B>(device.clone());
    let mut state = TrainingState::default();

    info!(
        "Training {} for {} epochs on {} examples ({} batches of {}), validating on {}",
        compiled.architecture,
        params.epochs,
        train.num_examples(),
        train.num_batches(),
        train.batch_size(),
        validation.num_examples()
    );

    for epoch in 1..=params.epochs {
        let started = Instant::now();
        let mut model = compiled.model.clone();
        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        let order = train.shuffled_order(&mut rng);
        let bar = progress_bar(epoch, params.epochs, train.num_batches());

        for (batch_idx, batch) in train.batches(&order, &batcher).enumerate() {
            let batch = batch?;
            let batch_size = batch.size();

            let logits = model.forward(batch.images);
            let loss = categorical_cross_entropy(logits.clone(), batch.labels.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                bar.abandon();
                return Err(Error::Training(format!(
                    "Loss became {loss_value} at epoch {epoch}, batch {}",
                    batch_idx + 1
                )));
            }
            loss_sum += loss_value * batch_size as f64;
            correct += correct_predictions(logits, batch.labels);
            seen += batch_size;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(learning_rate, model, grads);

            bar.set_message(format!(
                "loss = {:.4}, acc = {:.2}%",
                loss_sum / seen as f64,
                100.0 * correct as f64 / seen as f64
            ));
            bar.inc(1);
            debug!("Batch {}/{}: loss = {:.4}", batch_idx + 1, train.num_batches(), loss_value);
        }
        bar.finish_and_clear();
        compiled.model = model;

        let mut train_report = MetricsReport::new();
        train_report.insert(LOSS, loss_sum / seen.max(1) as f64);
        train_report.insert("accuracy", correct as f64 / seen.max(1) as f64);

        let val_report = if validation.num_examples() > 0 {
            evaluator::evaluate(compiled, validation)?
        } else {
            warn!("Validation split is empty, skipping validation");
            MetricsReport::new()
        };

        summaries.scalars(TRAIN, epoch, &train_report)?;
        summaries.scalar(TRAIN, epoch, "epoch_learning_rate", learning_rate)?;
        if !val_report.0.is_empty() {
            summaries.scalars(VALIDATION, epoch, &val_report)?;
        }
        if params.histogram_freq > 0 && epoch % params.histogram_freq == 0 {
            summaries.histograms(epoch, &compiled.model)?;
        }

        let info = CheckpointInfo::new(
            ctx.run_id.as_str(),
            epoch,
            compiled,
            train_report.clone(),
            val_report.clone(),
        );
        checkpoints.save(&compiled.model, &info)?;

        let improved = state.update_epoch(EpochMetrics {
            epoch,
            train: train_report.clone(),
            validation: val_report.clone(),
            learning_rate,
            elapsed_secs: started.elapsed().as_secs_f64(),
        });

        info!(
            "Epoch {}/{}: loss={:.4}, accuracy={:.4}, val_loss={:.4}, val_accuracy={:.4}{}",
            epoch,
            params.epochs,
            train_report.loss().unwrap_or(f64::NAN),
            train_report.accuracy().unwrap_or(f64::NAN),
            val_report.loss().unwrap_or(f64::NAN),
            val_report.accuracy().unwrap_or(f64::NAN),
            if improved { " (best)" } else { "" }
        );
    }

    let csv = summaries.write_history(&state.history)?;
    info!("Training history written to {:?}", csv);

    Ok(state.history)
}
