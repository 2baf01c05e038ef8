//! Loss and metric computation shared by training and evaluation.

use burn::tensor::{activation::log_softmax, backend::Backend, ElementConversion, Tensor};
use dogbreed_core::{MetricKind, MetricsReport, LOSS};

/// Categorical cross-entropy between logits and one-hot labels, averaged over the batch
pub fn categorical_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 2>,
) -> Tensor<B, 1> {
    (log_softmax(logits, 1) * labels).sum_dim(1).mean().neg()
}

/// Number of rows whose arg-max logit matches the one-hot label
pub fn correct_predictions<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 2>) -> usize {
    let correct: i64 = logits
        .argmax(1)
        .equal(labels.argmax(1))
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

/// Accumulates loss and compiled metrics over batches on the host
#[derive(Debug, Clone)]
pub struct MetricAccumulator {
    metrics: Vec<MetricKind>,
    num_classes: usize,
    loss_sum: f64,
    samples: usize,
    hits: Vec<usize>,
}

impl MetricAccumulator {
    /// `accuracy` is always tracked, even if absent from `metrics`
    pub fn new(metrics: &[MetricKind], num_classes: usize) -> Self {
        let mut tracked = vec![MetricKind::Accuracy];
        for metric in metrics {
            if !tracked.contains(metric) {
                tracked.push(*metric);
            }
        }
        let hits = vec![0; tracked.len()];
        Self {
            metrics: tracked,
            num_classes,
            loss_sum: 0.0,
            samples: 0,
            hits,
        }
    }

    /// Adds one batch given its mean loss and row-major logits and one-hot labels
    pub fn update(&mut self, mean_loss: f64, logits: &[f32], labels: &[f32]) {
        let rows = logits.len() / self.num_classes;
        self.loss_sum += mean_loss * rows as f64;
        self.samples += rows;

        for (scores, target) in logits
            .chunks(self.num_classes)
            .zip(labels.chunks(self.num_classes))
        {
            let label = argmax(target);
            let target_score = scores[label];
            let rank = scores.iter().filter(|&&s| s > target_score).count();

            for (metric, hits) in self.metrics.iter().zip(self.hits.iter_mut()) {
                // Accuracy breaks ties by first index, like `correct_predictions`
                let hit = match metric {
                    MetricKind::Accuracy => argmax(scores) == label,
                    MetricKind::TopKAccuracy(k) => rank < *k,
                };
                if hit {
                    *hits += 1;
                }
            }
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn report(&self) -> MetricsReport {
        let mut report = MetricsReport::new();
        let samples = self.samples.max(1) as f64;
        report.insert(LOSS, self.loss_sum / samples);
        for (metric, hits) in self.metrics.iter().zip(&self.hits) {
            report.insert(metric.name(), *hits as f64 / samples);
        }
        report
    }
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_value), (i, &v)| {
            if v > best_value {
                (i, v)
            } else {
                (best, best_value)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    #[test]
    fn test_cross_entropy_uniform_logits() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::zeros([2, 4], &device);
        let labels = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(vec![1.0f32, 0., 0., 0., 0., 0., 1., 0.], [2, 4]),
            &device,
        );

        let loss: f64 = categorical_cross_entropy(logits, labels).into_scalar().elem();
        assert!((loss - 4.0f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_correct_predictions() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(vec![2.0f32, 1.0, 0.0, 3.0], [2, 2]),
            &device,
        );
        let labels = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(vec![1.0f32, 0.0, 1.0, 0.0], [2, 2]),
            &device,
        );

        assert_eq!(correct_predictions(logits, labels), 1);
    }

    #[test]
    fn test_accumulator_top_k() {
        let mut acc = MetricAccumulator::new(&[MetricKind::TopKAccuracy(2)], 3);
        // Label ranks: first, second, third
        acc.update(
            0.5,
            &[0.9, 0.1, 0.0, 0.5, 0.1, 0.3],
            &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        );
        acc.update(1.0, &[0.0, 0.5, 1.0], &[1.0, 0.0, 0.0]);

        let report = acc.report();
        assert_eq!(acc.samples(), 3);
        assert!((report.loss().unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.accuracy().unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert!((report.get("top_2_accuracy").unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_tied_logits_matches_argmax() {
        let device = Default::default();
        let scores = [0.0f32, 0.0, 0.0];
        let target = [0.0f32, 0.0, 1.0];

        let mut acc = MetricAccumulator::new(&[MetricKind::TopKAccuracy(3)], 3);
        acc.update(1.0, &scores, &target);

        let logits = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(scores.to_vec(), [1, 3]),
            &device,
        );
        let labels = Tensor::<TestBackend, 2>::from_floats(
            TensorData::new(target.to_vec(), [1, 3]),
            &device,
        );

        let report = acc.report();
        assert_eq!(correct_predictions(logits, labels), 0);
        assert_eq!(report.accuracy(), Some(0.0));
        assert_eq!(report.get("top_3_accuracy"), Some(1.0));
    }
}
