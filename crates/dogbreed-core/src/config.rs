//! Configuration structures for a training run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::MetricKind;
use crate::types::{Architecture, InputShape};

/// Number of dog breeds in Stanford Dogs
pub const NUM_BREEDS: usize = 120;

/// Main configuration for one training run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Model configuration
    pub model: ModelConfig,
    /// Training hyperparameters
    pub training: TrainingParams,
    /// Data configuration
    pub data: DataConfig,
    /// Output configuration
    pub output: OutputConfig,
}

impl RunConfig {
    /// Validates value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let shape = self.model.input_shape;
        if shape.height == 0 || shape.width == 0 {
            return Err(Error::Config("input shape must be non-empty".to_string()));
        }
        if shape.channels != 3 {
            return Err(Error::Config(format!(
                "input shape must have 3 channels, got {}",
                shape.channels
            )));
        }
        if self.model.num_classes == 0 {
            return Err(Error::Config("num_classes must be greater than 0".to_string()));
        }
        if !(0.0..1.0).contains(&self.model.dropout) {
            return Err(Error::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.model.dropout
            )));
        }
        if self.training.epochs == 0 {
            return Err(Error::Config("epochs must be greater than 0".to_string()));
        }
        if self.training.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than 0".to_string()));
        }
        for metric in &self.model.metrics {
            if let MetricKind::TopKAccuracy(0) = metric {
                return Err(Error::Config("top_k_accuracy needs k > 0".to_string()));
            }
        }
        Ok(())
    }

    /// Name of the final saved-model directory under `trained_models/`
    pub fn save_name(&self) -> String {
        self.output
            .save_name
            .clone()
            .unwrap_or_else(|| format!("{}_1", self.model.architecture))
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Architecture to build
    pub architecture: Architecture,
    /// Input image shape
    pub input_shape: InputShape,
    /// Number of output classes
    pub num_classes: usize,
    /// Dropout rate in front of the classification layer
    pub dropout: f64,
    /// Metrics reported next to the loss
    pub metrics: Vec<MetricKind>,
    /// Saved model directory to warm-start from
    pub pretrained: Option<PathBuf>,
    /// Only train the classification head
    pub freeze_backbone: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::MobileNet,
            input_shape: InputShape::imagenet(),
            num_classes: NUM_BREEDS,
            dropout: 0.2,
            metrics: vec![MetricKind::Accuracy],
            pretrained: None,
            freeze_backbone: false,
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Number of training epochs
    pub epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// Random seed for weight init and shuffling
    pub seed: u64,
    /// Write weight histograms every N epochs (0 disables)
    pub histogram_freq: usize,
    /// Run the evaluator on the test split after training
    pub evaluate: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            seed: 0,
            histogram_freq: 1,
            evaluate: false,
        }
    }
}

/// Data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Dataset root containing `train/` and `test/`
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/stanford_dogs"),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that `checkpoints/`, `logs/` and `trained_models/` live in
    pub base_dir: PathBuf,
    /// Override for the saved-model directory name
    pub save_name: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            save_name: None,
        }
    }
}
