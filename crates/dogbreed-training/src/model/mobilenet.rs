//! MobileNet (v1, width multiplier 1.0) feature extractor.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    tensor::{backend::Backend, Tensor},
};

use super::BlockVisitor;

/// (output channels, stride) of the depthwise-separable blocks
const BLOCKS: [(usize, usize); 13] = [
    (64, 1),
    (128, 2),
    (128, 1),
    (256, 2),
    (256, 1),
    (512, 2),
    (512, 1),
    (512, 1),
    (512, 1),
    (512, 1),
    (512, 1),
    (1024, 2),
    (1024, 1),
];

fn relu6<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    x.clamp(0.0, 6.0)
}

/// Convolution, batch norm and ReLU6
#[derive(Module, Debug)]
pub struct ConvBnRelu6<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> ConvBnRelu6<B> {
    fn new(
        channels: [usize; 2],
        kernel_size: usize,
        stride: usize,
        groups: usize,
        device: &B::Device,
    ) -> Self {
        let padding = kernel_size / 2;
        Self {
            conv: Conv2dConfig::new(channels, [kernel_size, kernel_size])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .with_groups(groups)
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(channels[1]).init(device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        relu6(self.bn.forward(self.conv.forward(x)))
    }
}

/// 3x3 depthwise convolution followed by a 1x1 pointwise convolution
#[derive(Module, Debug)]
pub struct DepthwiseSeparable<B: Backend> {
    depthwise: ConvBnRelu6<B>,
    pointwise: ConvBnRelu6<B>,
}

impl<B: Backend> DepthwiseSeparable<B> {
    fn new(in_channels: usize, out_channels: usize, stride: usize, device: &B::Device) -> Self {
        Self {
            depthwise: ConvBnRelu6::new([in_channels, in_channels], 3, stride, in_channels, device),
            pointwise: ConvBnRelu6::new([in_channels, out_channels], 1, 1, 1, device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pointwise.forward(self.depthwise.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct MobileNet<B: Backend> {
    stem: ConvBnRelu6<B>,
    blocks: Vec<DepthwiseSeparable<B>>,
}

impl<B: Backend> MobileNet<B> {
    pub const OUT_CHANNELS: usize = 1024;

    pub fn new(device: &B::Device) -> Self {
        let mut in_channels = 32;
        let blocks = BLOCKS
            .iter()
            .map(|&(out_channels, stride)| {
                let block = DepthwiseSeparable::new(in_channels, out_channels, stride, device);
                in_channels = out_channels;
                block
            })
            .collect();

        Self {
            stem: ConvBnRelu6::new([3, 32], 3, 2, 1, device),
            blocks,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.stem.forward(x);
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }

    pub fn visit_blocks<V: BlockVisitor<B>>(&self, visitor: &mut V) {
        visitor.block("stem", &self.stem);
        for (i, block) in self.blocks.iter().enumerate() {
            visitor.block(&format!("block{}", i + 1), block);
        }
    }
}
