//! Training infrastructure for dog breed classification.
//!
//! This crate provides:
//! - Model architectures (AlexNet, VGG-16, ResNet-50, MobileNet)
//! - Model selection by architecture name
//! - Training loop with per-epoch validation, summaries and checkpoints
//! - Evaluation and model persistence

pub mod backend;
pub mod checkpoint;
pub mod evaluator;
pub mod factory;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod summary;
pub mod trainer;

pub use backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
pub use checkpoint::{load_model, save_model, CheckpointInfo, CheckpointSink, SavedModelInfo};
pub use evaluator::{evaluate, evaluate_and_report};
pub use factory::{select_model, CompiledModel, ModelSummary};
pub use model::DogBreedClassifier;
pub use pipeline::{run, run_from_disk, RunOutcome};
pub use summary::SummaryWriter;
pub use trainer::{fit, TrainingState};

/// Re-export commonly used types
pub mod prelude {
    pub use super::checkpoint::{load_model, save_model};
    pub use super::evaluator::evaluate;
    pub use super::factory::{select_model, CompiledModel};
    pub use super::pipeline::run;
    pub use super::trainer::fit;
}
