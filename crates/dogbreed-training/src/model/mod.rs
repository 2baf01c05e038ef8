//! Network architectures.
//!
//! Every architecture is a convolutional backbone followed by the same
//! transfer-learning head: global average pooling, dropout and a dense
//! layer with one output per class.

pub mod alexnet;
pub mod classifier;
pub mod mobilenet;
pub mod resnet50;
pub mod vgg16;

use burn::{
    module::Module,
    tensor::{backend::Backend, Tensor},
};
use dogbreed_core::Architecture;

pub use alexnet::AlexNet;
pub use classifier::{ClassifierHead, DogBreedClassifier};
pub use mobilenet::MobileNet;
pub use resnet50::ResNet50;
pub use vgg16::Vgg16;

/// Visits the named top-level blocks of a network
pub trait BlockVisitor<B: Backend> {
    fn block<M: Module<B>>(&mut self, name: &str, module: &M);
}

/// Feature extractor of one architecture
#[derive(Module, Debug)]
pub enum Backbone<B: Backend> {
    AlexNet(AlexNet<B>),
    Vgg16(Vgg16<B>),
    ResNet50(ResNet50<B>),
    MobileNet(MobileNet<B>),
}

impl<B: Backend> Backbone<B> {
    pub fn new(architecture: Architecture, device: &B::Device) -> Self {
        match architecture {
            Architecture::AlexNet => Backbone::AlexNet(AlexNet::new(device)),
            Architecture::Vgg16 => Backbone::Vgg16(Vgg16::new(device)),
            Architecture::ResNet50 => Backbone::ResNet50(ResNet50::new(device)),
            Architecture::MobileNet => Backbone::MobileNet(MobileNet::new(device)),
        }
    }

    /// Channels of the feature map fed to the head
    pub fn out_channels(architecture: Architecture) -> usize {
        match architecture {
            Architecture::AlexNet => AlexNet::<B>::OUT_CHANNELS,
            Architecture::Vgg16 => Vgg16::<B>::OUT_CHANNELS,
            Architecture::ResNet50 => ResNet50::<B>::OUT_CHANNELS,
            Architecture::MobileNet => MobileNet::<B>::OUT_CHANNELS,
        }
    }

    pub fn architecture(&self) -> Architecture {
        match self {
            Backbone::AlexNet(_) => Architecture::AlexNet,
            Backbone::Vgg16(_) => Architecture::Vgg16,
            Backbone::ResNet50(_) => Architecture::ResNet50,
            Backbone::MobileNet(_) => Architecture::MobileNet,
        }
    }

    /// Channels-first input [N, 3, H, W] to a feature map [N, C, h, w]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Backbone::AlexNet(net) => net.forward(x),
            Backbone::Vgg16(net) => net.forward(x),
            Backbone::ResNet50(net) => net.forward(x),
            Backbone::MobileNet(net) => net.forward(x),
        }
    }

    pub fn visit_blocks<V: BlockVisitor<B>>(&self, visitor: &mut V) {
        match self {
            Backbone::AlexNet(net) => net.visit_blocks(visitor),
            Backbone::Vgg16(net) => net.visit_blocks(visitor),
            Backbone::ResNet50(net) => net.visit_blocks(visitor),
            Backbone::MobileNet(net) => net.visit_blocks(visitor),
        }
    }
}
