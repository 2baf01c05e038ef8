//! Run context: configuration plus the run id and every path derived from it.
//!
//! A `RunContext` is built once at process start and passed by reference to
//! model selection, training and evaluation.

use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::error::Result;
use crate::types::RunId;

/// Directory holding per-run checkpoint directories
pub const CHECKPOINTS_DIR: &str = "checkpoints";
/// Directory holding per-run summary logs
pub const LOGS_DIR: &str = "logs/fit";
/// Directory holding final saved models
pub const TRAINED_MODELS_DIR: &str = "trained_models";
/// Checkpoint file name inside a run's checkpoint directory
pub const CHECKPOINT_FILE: &str = "model.ckpt";

/// Filesystem locations of one run's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// `checkpoints/<run_id>/`
    pub checkpoint_dir: PathBuf,
    /// `checkpoints/<run_id>/model.ckpt`
    pub checkpoint_file: PathBuf,
    /// `logs/fit/<run_id>/`
    pub log_dir: PathBuf,
    /// `trained_models/<save_name>/`
    pub save_dir: PathBuf,
}

impl RunPaths {
    pub fn new(base_dir: &Path, run_id: &RunId, save_name: &str) -> Self {
        let checkpoint_dir = base_dir.join(CHECKPOINTS_DIR).join(run_id.as_str());
        Self {
            checkpoint_file: checkpoint_dir.join(CHECKPOINT_FILE),
            checkpoint_dir,
            log_dir: base_dir.join(LOGS_DIR).join(run_id.as_str()),
            save_dir: base_dir.join(TRAINED_MODELS_DIR).join(save_name),
        }
    }
}

/// Everything a run needs to know about itself
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: RunConfig,
    pub run_id: RunId,
    pub paths: RunPaths,
}

impl RunContext {
    /// Validate the config and derive paths from a fresh timestamp run id
    pub fn new(config: RunConfig) -> Result<Self> {
        Self::with_run_id(config, RunId::now())
    }

    /// Validate the config and derive paths from an explicit run id
    pub fn with_run_id(config: RunConfig, run_id: RunId) -> Result<Self> {
        config.validate()?;
        let paths = RunPaths::new(&config.output.base_dir, &run_id, &config.save_name());
        Ok(Self {
            config,
            run_id,
            paths,
        })
    }
}
