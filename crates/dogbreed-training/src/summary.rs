//! Per-run summary sink under `logs/fit/<run_id>/`.
//!
//! Scalars and weight histograms are appended as JSON lines, one event per
//! line, split into `train/` and `validation/` subdirectories.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use burn::{
    module::{Module, ModuleVisitor, ParamId},
    tensor::{backend::Backend, Tensor},
};
use chrono::Utc;
use dogbreed_core::{History, MetricsReport, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{BlockVisitor, DogBreedClassifier};

pub const TRAIN: &str = "train";
pub const VALIDATION: &str = "validation";
pub const SCALARS_FILE: &str = "scalars.jsonl";
pub const HISTOGRAMS_FILE: &str = "histograms.jsonl";
pub const METRICS_CSV: &str = "metrics.csv";

const HISTOGRAM_BUCKETS: usize = 30;

/// One scalar value at the end of an epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    pub wall_time: f64,
    pub epoch: usize,
    pub tag: String,
    pub value: f64,
}

/// Distribution of one block's weights at the end of an epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramEvent {
    pub wall_time: f64,
    pub epoch: usize,
    pub tag: String,
    pub min: f64,
    pub max: f64,
    pub num: usize,
    pub sum: f64,
    pub sum_squares: f64,
    /// Upper edge of each bucket
    pub bucket_limits: Vec<f64>,
    pub bucket_counts: Vec<u64>,
}

impl HistogramEvent {
    /// Equal-width buckets between the min and max value; `None` for no values
    pub fn from_values(epoch: usize, tag: impl Into<String>, values: &[f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let (min, max) = values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        });
        let buckets = if max > min { HISTOGRAM_BUCKETS } else { 1 };
        let width = (max - min) / buckets as f64;

        let mut bucket_counts = vec![0u64; buckets];
        for &v in values {
            let index = if width > 0.0 {
                (((v as f64 - min) / width) as usize).min(buckets - 1)
            } else {
                0
            };
            bucket_counts[index] += 1;
        }
        let bucket_limits = (1..=buckets)
            .map(|i| if i == buckets { max } else { min + width * i as f64 })
            .collect();

        Some(Self {
            wall_time: wall_time(),
            epoch,
            tag: tag.into(),
            min,
            max,
            num: values.len(),
            sum: values.iter().map(|&v| v as f64).sum(),
            sum_squares: values.iter().map(|&v| (v as f64) * (v as f64)).sum(),
            bucket_limits,
            bucket_counts,
        })
    }
}

fn wall_time() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Collects the float parameters of a module as host values
#[derive(Default)]
struct WeightCollector {
    values: Vec<f32>,
}

impl<B: Backend> ModuleVisitor<B> for WeightCollector {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        if let Ok(values) = tensor.to_data().convert::<f32>().to_vec::<f32>() {
            self.values.extend(values);
        }
    }
}

/// One histogram per top-level block
struct BlockHistograms {
    epoch: usize,
    events: Vec<HistogramEvent>,
}

impl<B: Backend> BlockVisitor<B> for BlockHistograms {
    fn block<M: Module<B>>(&mut self, name: &str, module: &M) {
        let mut collector = WeightCollector::default();
        module.visit(&mut collector);
        if let Some(event) =
            HistogramEvent::from_values(self.epoch, format!("{name}/weights"), &collector.values)
        {
            self.events.push(event);
        }
    }
}

/// Writes summaries of one run
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    log_dir: PathBuf,
}

impl SummaryWriter {
    /// Creates the log directory with its `train/` and `validation/` parts
    pub fn new(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir.join(TRAIN))?;
        fs::create_dir_all(log_dir.join(VALIDATION))?;
        Ok(Self {
            log_dir: log_dir.to_path_buf(),
        })
    }

    /// Appends `epoch_<metric>` scalars for one split
    pub fn scalars(&self, split: &str, epoch: usize, report: &MetricsReport) -> Result<()> {
        let events: Vec<ScalarEvent> = report
            .iter()
            .map(|(name, value)| ScalarEvent {
                wall_time: wall_time(),
                epoch,
                tag: format!("epoch_{name}"),
                value: *value,
            })
            .collect();
        self.append(&self.log_dir.join(split).join(SCALARS_FILE), &events)
    }

    /// Appends a single scalar for one split
    pub fn scalar(&self, split: &str, epoch: usize, tag: &str, value: f64) -> Result<()> {
        let event = ScalarEvent {
            wall_time: wall_time(),
            epoch,
            tag: tag.to_string(),
            value,
        };
        self.append(&self.log_dir.join(split).join(SCALARS_FILE), &[event])
    }

    /// Appends weight histograms of every block of the model
    pub fn histograms<B: Backend>(&self, epoch: usize, model: &DogBreedClassifier<B>) -> Result<()> {
        let mut visitor = BlockHistograms {
            epoch,
            events: Vec::new(),
        };
        model.visit_blocks(&mut visitor);
        debug!("Writing {} weight histograms for epoch {}", visitor.events.len(), epoch);
        self.append(&self.log_dir.join(TRAIN).join(HISTOGRAMS_FILE), &visitor.events)
    }

    /// Writes the epoch history as `metrics.csv`
    pub fn write_history(&self, history: &History) -> Result<PathBuf> {
        let path = self.log_dir.join(METRICS_CSV);
        fs::write(&path, history.to_csv())?;
        Ok(path)
    }

    fn append<T: Serialize>(&self, path: &Path, events: &[T]) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for event in events {
            writeln!(file, "{}", serde_json::to_string(event)?)?;
        }
        Ok(())
    }
}

/// Reads every event of a JSON-lines summary file
pub fn read_events<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    fs::read_to_string(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> Result<T> { Ok(serde_json::from_str(line)?) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogbreed_core::LOSS;

    #[test]
    fn test_histogram_buckets() {
        let values: Vec<f32> = (0..300).map(|i| i as f32 / 299.0).collect();
        let event = HistogramEvent::from_values(1, "dense/weights", &values).unwrap();

        assert_eq!(event.bucket_counts.len(), 30);
        assert_eq!(event.bucket_limits.len(), 30);
        assert_eq!(event.bucket_counts.iter().sum::<u64>(), 300);
        assert_eq!(event.min, 0.0);
        assert_eq!(event.max, 1.0);
        assert_eq!(*event.bucket_limits.last().unwrap(), 1.0);
    }

    #[test]
    fn test_constant_histogram() {
        let event = HistogramEvent::from_values(1, "bias", &[0.5; 4]).unwrap();
        assert_eq!(event.bucket_counts, vec![4]);
        assert!(HistogramEvent::from_values(1, "empty", &[]).is_none());
    }

    #[test]
    fn test_scalars_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SummaryWriter::new(&dir.path().join("run")).unwrap();

        let mut report = MetricsReport::new();
        report.insert(LOSS, 1.5);
        report.insert("accuracy", 0.25);
        writer.scalars(TRAIN, 1, &report).unwrap();
        writer.scalar(TRAIN, 1, "epoch_learning_rate", 0.0001).unwrap();

        let events: Vec<ScalarEvent> =
            read_events(&dir.path().join("run/train/scalars.jsonl")).unwrap();
        let tags: Vec<&str> = events.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["epoch_accuracy", "epoch_loss", "epoch_learning_rate"]);
        assert!(dir.path().join("run/validation").is_dir());
    }
}
