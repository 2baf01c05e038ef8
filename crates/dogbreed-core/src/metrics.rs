//! Metrics tracked during training and reported by evaluation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name under which the loss is reported
pub const LOSS: &str = "loss";

/// A metric a model is compiled with, reported next to the loss
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Fraction of samples whose arg-max prediction matches the label
    Accuracy,
    /// Fraction of samples whose label is within the k highest scores
    TopKAccuracy(usize),
}

impl MetricKind {
    /// Name used in reports and summaries
    pub fn name(&self) -> String {
        match self {
            MetricKind::Accuracy => "accuracy".to_string(),
            MetricKind::TopKAccuracy(k) => format!("top_{k}_accuracy"),
        }
    }
}

/// Metric name -> value, in stable key order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport(pub BTreeMap<String, f64>);

impl MetricsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn loss(&self) -> Option<f64> {
        self.get(LOSS)
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.get("accuracy")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    /// One `name: value` line per metric, two decimals
    pub fn lines(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(name, value)| format!("{name}: {value:.2}"))
            .collect()
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Metrics for a single epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,
    pub train: MetricsReport,
    pub validation: MetricsReport,
    pub learning_rate: f64,
    pub elapsed_secs: f64,
}

/// Per-epoch history returned by training
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub epochs: Vec<EpochMetrics>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    /// Gets the best validation accuracy
    pub fn best_val_accuracy(&self) -> Option<f64> {
        self.epochs
            .iter()
            .filter_map(|e| e.validation.accuracy())
            .fold(None, |best, acc| match best {
                Some(b) if b >= acc => Some(b),
                _ => Some(acc),
            })
    }

    /// Gets the epoch with best validation accuracy
    pub fn best_epoch(&self) -> Option<usize> {
        let best = self.best_val_accuracy()?;
        self.epochs
            .iter()
            .find(|e| e.validation.accuracy() == Some(best))
            .map(|e| e.epoch)
    }

    /// Render as CSV with one row per epoch
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("epoch,train_loss,train_acc,val_loss,val_acc,learning_rate\n");
        for e in &self.epochs {
            csv.push_str(&format!(
                "{},{:.6},{:.6},{:.6},{:.6},{:.6}\n",
                e.epoch,
                e.train.loss().unwrap_or(f64::NAN),
                e.train.accuracy().unwrap_or(f64::NAN),
                e.validation.loss().unwrap_or(f64::NAN),
                e.validation.accuracy().unwrap_or(f64::NAN),
                e.learning_rate
            ));
        }
        csv
    }
}
