//! Model selection and compilation.
//!
//! A [`CompiledModel`] bundles a network with everything needed to train and
//! evaluate it: the architecture it was built from, its input shape and
//! class count, the fixed learning rate of the architecture, the optimizer
//! configuration and the metrics reported next to the loss.

use std::fmt;
use std::path::Path;

use burn::{module::Module, optim::AdamConfig, tensor::backend::AutodiffBackend};
use dogbreed_core::{Architecture, InputShape, MetricKind, ModelConfig, Result, RunContext};
use tracing::info;

use crate::checkpoint;
use crate::model::{BlockVisitor, DogBreedClassifier};

/// A network ready for training
#[derive(Clone)]
pub struct CompiledModel<B: AutodiffBackend> {
    pub model: DogBreedClassifier<B>,
    pub architecture: Architecture,
    pub input_shape: InputShape,
    pub num_classes: usize,
    pub dropout: f64,
    pub learning_rate: f64,
    pub optimizer: AdamConfig,
    pub metrics: Vec<MetricKind>,
    pub frozen_backbone: bool,
}

impl<B: AutodiffBackend> fmt::Debug for CompiledModel<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledModel")
            .field("architecture", &self.architecture)
            .field("input_shape", &self.input_shape)
            .field("num_classes", &self.num_classes)
            .field("dropout", &self.dropout)
            .field("learning_rate", &self.learning_rate)
            .field("metrics", &self.metrics)
            .field("frozen_backbone", &self.frozen_backbone)
            .finish_non_exhaustive()
    }
}

impl<B: AutodiffBackend> CompiledModel<B> {
    /// Builds a freshly initialized network from a model configuration
    pub fn compile(config: &ModelConfig, learning_rate: f64, device: &B::Device) -> Self {
        let architecture = config.architecture;
        Self {
            model: DogBreedClassifier::new(architecture, config.num_classes, config.dropout, device),
            architecture,
            input_shape: config.input_shape,
            num_classes: config.num_classes,
            dropout: config.dropout,
            learning_rate,
            optimizer: AdamConfig::new(),
            metrics: config.metrics.clone(),
            frozen_backbone: false,
        }
    }

    pub fn num_params(&self) -> usize {
        self.model.num_params()
    }

    /// Loads weights from a saved model directory
    pub fn load_pretrained(mut self, dir: &Path, device: &B::Device) -> Result<Self> {
        self.model = checkpoint::load_weights(self.model, dir, self.architecture, self.num_classes, device)?;
        info!("Warm-started {} from {}", self.architecture, dir.display());
        Ok(self)
    }

    /// Stop training the backbone; only the classification head keeps learning
    pub fn freeze_backbone(mut self) -> Self {
        self.model = self.model.freeze_backbone();
        self.frozen_backbone = true;
        self
    }

    /// Parameter counts per top-level block
    pub fn summary(&self) -> ModelSummary {
        let mut counter = ParamCounter::default();
        self.model.visit_blocks(&mut counter);

        let total_params = self.num_params();
        let trainable_params = if self.frozen_backbone {
            counter
                .blocks
                .iter()
                .filter(|block| block.name == "classifier")
                .map(|block| block.params)
                .sum()
        } else {
            total_params
        };

        ModelSummary {
            architecture: self.architecture,
            input_shape: self.input_shape,
            num_classes: self.num_classes,
            blocks: counter.blocks,
            total_params,
            trainable_params,
        }
    }
}

fn compile_architecture<B: AutodiffBackend>(
    architecture: Architecture,
    input_shape: InputShape,
    num_classes: usize,
    learning_rate: f64,
    device: &B::Device,
) -> CompiledModel<B> {
    let config = ModelConfig {
        architecture,
        input_shape,
        num_classes,
        ..ModelConfig::default()
    };
    CompiledModel::compile(&config, learning_rate, device)
}

pub fn alexnet<B: AutodiffBackend>(
    input_shape: InputShape,
    num_classes: usize,
    learning_rate: f64,
    device: &B::Device,
) -> CompiledModel<B> {
    compile_architecture(Architecture::AlexNet, input_shape, num_classes, learning_rate, device)
}

pub fn vgg16<B: AutodiffBackend>(
    input_shape: InputShape,
    num_classes: usize,
    learning_rate: f64,
    device: &B::Device,
) -> CompiledModel<B> {
    compile_architecture(Architecture::Vgg16, input_shape, num_classes, learning_rate, device)
}

pub fn resnet50<B: AutodiffBackend>(
    input_shape: InputShape,
    num_classes: usize,
    learning_rate: f64,
    device: &B::Device,
) -> CompiledModel<B> {
    compile_architecture(Architecture::ResNet50, input_shape, num_classes, learning_rate, device)
}

pub fn mobilenet<B: AutodiffBackend>(
    input_shape: InputShape,
    num_classes: usize,
    learning_rate: f64,
    device: &B::Device,
) -> CompiledModel<B> {
    compile_architecture(Architecture::MobileNet, input_shape, num_classes, learning_rate, device)
}

/// Returns a compiled model for the architecture called `name`.
///
/// Input shape, class count, dropout and metrics come from the run
/// configuration and the learning rate is fixed per architecture. Any other
/// name fails with `Error::UnsupportedArchitecture`.
pub fn select_model<B: AutodiffBackend>(
    name: &str,
    ctx: &RunContext,
    device: &B::Device,
) -> Result<CompiledModel<B>> {
    let architecture: Architecture = name.parse()?;
    let model_config = &ctx.config.model;
    let config = ModelConfig {
        architecture,
        ..model_config.clone()
    };
    let mut compiled = CompiledModel::compile(&config, architecture.learning_rate(), device);

    if let Some(dir) = &model_config.pretrained {
        compiled = compiled.load_pretrained(dir, device)?;
    }
    if model_config.freeze_backbone {
        compiled = compiled.freeze_backbone();
    }

    info!(
        "Selected {} (input {}, {} classes, lr {}, {} parameters)",
        architecture,
        compiled.input_shape,
        compiled.num_classes,
        compiled.learning_rate,
        compiled.num_params()
    );

    Ok(compiled)
}

#[derive(Default)]
struct ParamCounter {
    blocks: Vec<BlockParams>,
}

impl<B: burn::tensor::backend::Backend> BlockVisitor<B> for ParamCounter {
    fn block<M: Module<B>>(&mut self, name: &str, module: &M) {
        self.blocks.push(BlockParams {
            name: name.to_string(),
            params: module.num_params(),
        });
    }
}

/// Parameters of one top-level block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockParams {
    pub name: String,
    pub params: usize,
}

/// Structural summary printed before training
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub architecture: Architecture,
    pub input_shape: InputShape,
    pub num_classes: usize,
    pub blocks: Vec<BlockParams>,
    pub total_params: usize,
    pub trainable_params: usize,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(44);
        writeln!(f, "Model: \"{}\"", self.architecture)?;
        writeln!(f, "Input: {}  Classes: {}", self.input_shape, self.num_classes)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "{:<28}{:>16}", "Block", "Params")?;
        writeln!(f, "{rule}")?;
        for block in &self.blocks {
            writeln!(f, "{:<28}{:>16}", block.name, block.params)?;
        }
        writeln!(f, "{rule}")?;
        writeln!(f, "Total params: {}", self.total_params)?;
        writeln!(f, "Trainable params: {}", self.trainable_params)?;
        write!(
            f,
            "Non-trainable params: {}",
            self.total_params - self.trainable_params
        )
    }
}
