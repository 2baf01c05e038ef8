//! Full classifier: backbone plus transfer-learning head.

use burn::{
    module::Module,
    nn::{
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig,
    },
    tensor::{backend::Backend, Tensor},
};
use dogbreed_core::Architecture;

use super::{Backbone, BlockVisitor};

/// Global average pooling, dropout and a dense classification layer
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pool: AdaptiveAvgPool2d,
    dropout: Dropout,
    fc: Linear<B>,
}

impl<B: Backend> ClassifierHead<B> {
    pub fn new(in_channels: usize, num_classes: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(dropout).init(),
            fc: LinearConfig::new(in_channels, num_classes).init(device),
        }
    }

    /// Feature map [N, C, h, w] to logits [N, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);
        let x = self.dropout.forward(x);
        self.fc.forward(x)
    }
}

/// Dog breed classifier over channels-last images
#[derive(Module, Debug)]
pub struct DogBreedClassifier<B: Backend> {
    pub backbone: Backbone<B>,
    pub head: ClassifierHead<B>,
    num_classes: usize,
}

impl<B: Backend> DogBreedClassifier<B> {
    pub fn new(
        architecture: Architecture,
        num_classes: usize,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let backbone = Backbone::new(architecture, device);
        let head = ClassifierHead::new(
            Backbone::<B>::out_channels(architecture),
            num_classes,
            dropout,
            device,
        );
        Self {
            backbone,
            head,
            num_classes,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `images` - Tensor of shape [batch_size, height, width, 3]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = images.permute([0, 3, 1, 2]);
        let features = self.backbone.forward(x);
        self.head.forward(features)
    }

    pub fn architecture(&self) -> Architecture {
        self.backbone.architecture()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Stop gradients through the backbone so only the head trains
    pub fn freeze_backbone(self) -> Self {
        Self {
            backbone: self.backbone.no_grad(),
            head: self.head,
            num_classes: self.num_classes,
        }
    }

    /// Visits backbone blocks followed by the head
    pub fn visit_blocks<V: BlockVisitor<B>>(&self, visitor: &mut V) {
        self.backbone.visit_blocks(visitor);
        visitor.block("classifier", &self.head);
    }
}
