//! AlexNet feature extractor.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use super::BlockVisitor;

/// Convolution followed by ReLU
#[derive(Module, Debug)]
pub struct ConvRelu<B: Backend> {
    conv: Conv2d<B>,
    relu: Relu,
}

impl<B: Backend> ConvRelu<B> {
    fn new(
        channels: [usize; 2],
        kernel_size: usize,
        stride: usize,
        padding: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            conv: Conv2dConfig::new(channels, [kernel_size, kernel_size])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .init(device),
            relu: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.relu.forward(self.conv.forward(x))
    }
}

/// Five convolutions, max pooling after the 1st, 2nd and 5th
#[derive(Module, Debug)]
pub struct AlexNet<B: Backend> {
    conv1: ConvRelu<B>,
    conv2: ConvRelu<B>,
    conv3: ConvRelu<B>,
    conv4: ConvRelu<B>,
    conv5: ConvRelu<B>,
    pool: MaxPool2d,
}

impl<B: Backend> AlexNet<B> {
    pub const OUT_CHANNELS: usize = 256;

    pub fn new(device: &B::Device) -> Self {
        Self {
            conv1: ConvRelu::new([3, 64], 11, 4, 2, device),
            conv2: ConvRelu::new([64, 192], 5, 1, 2, device),
            conv3: ConvRelu::new([192, 384], 3, 1, 1, device),
            conv4: ConvRelu::new([384, 256], 3, 1, 1, device),
            conv5: ConvRelu::new([256, 256], 3, 1, 1, device),
            pool: MaxPool2dConfig::new([3, 3]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.pool.forward(self.conv1.forward(x));
        let x = self.pool.forward(self.conv2.forward(x));
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);
        self.pool.forward(self.conv5.forward(x))
    }

    pub fn visit_blocks<V: BlockVisitor<B>>(&self, visitor: &mut V) {
        visitor.block("conv1", &self.conv1);
        visitor.block("conv2", &self.conv2);
        visitor.block("conv3", &self.conv3);
        visitor.block("conv4", &self.conv4);
        visitor.block("conv5", &self.conv5);
    }
}
