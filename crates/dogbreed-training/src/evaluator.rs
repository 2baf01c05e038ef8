//! Model evaluation over a prepared split.

use burn::{
    module::{AutodiffModule, Module},
    tensor::{backend::AutodiffBackend, ElementConversion, TensorData},
};
use dogbreed_core::{Error, MetricsReport, Result};
use dogbreed_dataset::PreparedSplit;
use tracing::{debug, info};

use crate::factory::CompiledModel;
use crate::metrics::{categorical_cross_entropy, MetricAccumulator};

/// Computes the loss and compiled metrics of a model over a full split.
///
/// Runs the network in inference mode on the inner backend: dropout is
/// disabled and batch norm uses its running statistics, so the model is
/// never modified and repeated calls return identical values.
pub fn evaluate<B: AutodiffBackend>(
    compiled: &CompiledModel<B>,
    split: &PreparedSplit,
) -> Result<MetricsReport> {
    if split.num_examples() == 0 {
        return Err(Error::Dataset("Cannot evaluate on an empty split".to_string()));
    }
    if split.num_classes() != compiled.num_classes {
        return Err(Error::InvalidArgument(format!(
            "Split has {} classes but the model outputs {}",
            split.num_classes(),
            compiled.num_classes
        )));
    }

    let model = compiled.model.valid();
    let device = model
        .devices()
        .into_iter()
        .next()
        .unwrap_or_default();
    let batcher = split.batcher::<B::InnerBackend>(device);

    info!("Starting evaluation on {} batches", split.num_batches());

    let mut accumulator = MetricAccumulator::new(&compiled.metrics, compiled.num_classes);
    let order = split.order();
    for batch in split.batches(&order, &batcher) {
        let batch = batch?;
        let logits = model.forward(batch.images);

        let loss: f64 = categorical_cross_entropy(logits.clone(), batch.labels.clone())
            .into_scalar()
            .elem();
        let logits = host_values(logits.into_data())?;
        let labels = host_values(batch.labels.into_data())?;
        accumulator.update(loss, &logits, &labels);
    }

    let report = accumulator.report();
    debug!("Evaluated {} examples", accumulator.samples());
    Ok(report)
}

/// Evaluates and prints one `name: value` line per metric
pub fn evaluate_and_report<B: AutodiffBackend>(
    compiled: &CompiledModel<B>,
    split: &PreparedSplit,
) -> Result<MetricsReport> {
    let report = evaluate(compiled, split)?;
    for line in report.lines() {
        println!("{line}");
    }
    Ok(report)
}

fn host_values(data: TensorData) -> Result<Vec<f32>> {
    data.convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::Training(format!("Failed to read tensor data: {e:?}")))
}
