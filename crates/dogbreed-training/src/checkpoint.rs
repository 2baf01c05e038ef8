//! Checkpoint and saved-model persistence.
//!
//! Two sinks with different lifetimes:
//! - `checkpoints/<run_id>/model.ckpt` holds the weights of the latest epoch
//!   and is overwritten every epoch; `checkpoint.json` describes that epoch.
//! - `trained_models/<save_name>/` holds the final model: `model.mpk` with
//!   the parameters, `model.json` with the architecture needed to rebuild
//!   it, and `config.toml` with the resolved run configuration.

use std::fs;
use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, NamedMpkFileRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
};
use chrono::Utc;
use dogbreed_core::{
    Architecture, Error, InputShape, MetricKind, MetricsReport, ModelConfig, Result, RunContext,
    RunPaths,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::factory::CompiledModel;
use crate::model::DogBreedClassifier;

pub const CHECKPOINT_INFO_FILE: &str = "checkpoint.json";
pub const MODEL_FILE_STEM: &str = "model";
pub const MODEL_INFO_FILE: &str = "model.json";
pub const CONFIG_FILE: &str = "config.toml";

type BytesRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;
type FileRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Description of the epoch stored in a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub run_id: String,
    pub epoch: usize,
    pub architecture: Architecture,
    pub num_classes: usize,
    pub learning_rate: f64,
    pub train: MetricsReport,
    pub validation: MetricsReport,
    pub timestamp: String,
}

impl CheckpointInfo {
    pub fn new<B: AutodiffBackend>(
        run_id: &str,
        epoch: usize,
        compiled: &CompiledModel<B>,
        train: MetricsReport,
        validation: MetricsReport,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            epoch,
            architecture: compiled.architecture,
            num_classes: compiled.num_classes,
            learning_rate: compiled.learning_rate,
            train,
            validation,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Save checkpoint info to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize checkpoint: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load checkpoint info from file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize checkpoint: {e}")))
    }
}

/// Per-run checkpoint sink, overwritten every epoch
#[derive(Debug, Clone)]
pub struct CheckpointSink {
    checkpoint_file: PathBuf,
    info_file: PathBuf,
}

impl CheckpointSink {
    pub fn new(paths: &RunPaths) -> Self {
        Self {
            checkpoint_file: paths.checkpoint_file.clone(),
            info_file: paths.checkpoint_dir.join(CHECKPOINT_INFO_FILE),
        }
    }

    pub fn checkpoint_file(&self) -> &Path {
        &self.checkpoint_file
    }

    /// Writes the model weights and the epoch description
    pub fn save<B: Backend>(&self, model: &DogBreedClassifier<B>, info: &CheckpointInfo) -> Result<()> {
        if let Some(parent) = self.checkpoint_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = Recorder::<B>::record(&BytesRecorder::default(), model.clone().into_record(), ())
            .map_err(|e| Error::Checkpoint(format!("Failed to record weights: {e:?}")))?;
        fs::write(&self.checkpoint_file, bytes)?;
        info.save(&self.info_file)?;

        debug!("Checkpoint for epoch {} saved to {:?}", info.epoch, self.checkpoint_file);
        Ok(())
    }

    /// Loads the checkpointed weights into a model of the same architecture
    pub fn load_weights<B: Backend>(
        &self,
        model: DogBreedClassifier<B>,
        device: &B::Device,
    ) -> Result<DogBreedClassifier<B>> {
        let bytes = fs::read(&self.checkpoint_file)?;
        let record = Recorder::<B>::load(&BytesRecorder::default(), bytes, device)
            .map_err(|e| Error::Checkpoint(format!("Failed to load checkpoint: {e:?}")))?;
        Ok(model.load_record(record))
    }
}

/// Everything needed to rebuild a saved model before loading its weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModelInfo {
    pub architecture: Architecture,
    pub input_shape: InputShape,
    pub num_classes: usize,
    pub dropout: f64,
    pub learning_rate: f64,
    pub metrics: Vec<MetricKind>,
    pub num_params: usize,
    pub run_id: Option<String>,
    pub saved_at: String,
}

impl SavedModelInfo {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MODEL_INFO_FILE);
        let json = fs::read_to_string(&path).map_err(|e| {
            Error::Model(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Saves the final model into `dir`
pub fn save_model<B: AutodiffBackend>(
    compiled: &CompiledModel<B>,
    dir: &Path,
    ctx: Option<&RunContext>,
) -> Result<SavedModelInfo> {
    fs::create_dir_all(dir)?;

    compiled
        .model
        .clone()
        .save_file(dir.join(MODEL_FILE_STEM), &FileRecorder::new())
        .map_err(|e| Error::Checkpoint(format!("Failed to save model: {e:?}")))?;

    let info = SavedModelInfo {
        architecture: compiled.architecture,
        input_shape: compiled.input_shape,
        num_classes: compiled.num_classes,
        dropout: compiled.dropout,
        learning_rate: compiled.learning_rate,
        metrics: compiled.metrics.clone(),
        num_params: compiled.num_params(),
        run_id: ctx.map(|ctx| ctx.run_id.to_string()),
        saved_at: Utc::now().to_rfc3339(),
    };
    fs::write(dir.join(MODEL_INFO_FILE), serde_json::to_string_pretty(&info)?)?;

    if let Some(ctx) = ctx {
        let config = toml::to_string_pretty(&ctx.config)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {e}")))?;
        fs::write(dir.join(CONFIG_FILE), config)?;
    }

    info!("Model saved to {:?}", dir);
    Ok(info)
}

/// Loads weights saved by [`save_model`] into a model of the same architecture
pub fn load_weights<B: Backend>(
    model: DogBreedClassifier<B>,
    dir: &Path,
    architecture: Architecture,
    num_classes: usize,
    device: &B::Device,
) -> Result<DogBreedClassifier<B>> {
    let info = SavedModelInfo::load(dir)?;
    if info.architecture != architecture || info.num_classes != num_classes {
        return Err(Error::Model(format!(
            "Saved model {} is {} with {} classes, expected {} with {} classes",
            dir.display(),
            info.architecture,
            info.num_classes,
            architecture,
            num_classes
        )));
    }

    model
        .load_file(dir.join(MODEL_FILE_STEM), &FileRecorder::new(), device)
        .map_err(|e| Error::Model(format!("Failed to load weights from {}: {e:?}", dir.display())))
}

/// Rebuilds a saved model and loads its weights
pub fn load_model<B: AutodiffBackend>(dir: &Path, device: &B::Device) -> Result<CompiledModel<B>> {
    let info = SavedModelInfo::load(dir)?;
    let config = ModelConfig {
        architecture: info.architecture,
        input_shape: info.input_shape,
        num_classes: info.num_classes,
        dropout: info.dropout,
        metrics: info.metrics.clone(),
        pretrained: None,
        freeze_backbone: false,
    };

    let compiled = CompiledModel::<B>::compile(&config, info.learning_rate, device);
    compiled.load_pretrained(dir, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogbreed_core::{RunId, LOSS};

    #[test]
    fn test_checkpoint_info_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt/checkpoint.json");

        let mut train = MetricsReport::new();
        train.insert(LOSS, 0.7);
        let info = CheckpointInfo {
            run_id: "20210803-120000".to_string(),
            epoch: 3,
            architecture: Architecture::MobileNet,
            num_classes: 120,
            learning_rate: 0.0001,
            train,
            validation: MetricsReport::new(),
            timestamp: "2021-08-03T12:00:00Z".to_string(),
        };

        info.save(&path).unwrap();
        assert_eq!(CheckpointInfo::load(&path).unwrap(), info);
    }

    #[test]
    fn test_sink_paths_follow_run_paths() {
        let paths = RunPaths::new(Path::new("out"), &RunId::new("r1"), "m");
        let sink = CheckpointSink::new(&paths);

        assert_eq!(sink.checkpoint_file(), Path::new("out/checkpoints/r1/model.ckpt"));
        assert_eq!(sink.info_file, PathBuf::from("out/checkpoints/r1/checkpoint.json"));
    }

    #[test]
    fn test_missing_saved_model_is_model_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(SavedModelInfo::load(dir.path()), Err(Error::Model(_))));
    }
}
