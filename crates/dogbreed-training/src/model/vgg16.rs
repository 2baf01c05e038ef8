//! VGG-16 feature extractor.

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

/// (output channels, convolutions) per block
const BLOCKS: [(usize, usize); 5] = [(64, 2), (128, 2), (256, 3), (512, 3), (512, 3)];

/// 3x3 convolutions with ReLU, closed by a 2x2 max pool
#[derive(Module, Debug)]
pub struct VggBlock<B: Backend> {
    convs: Vec<Conv2d<B>>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> VggBlock<B> {
    fn new(in_channels: usize, out_channels: usize, num_convs: usize, device: &B::Device) -> Self {
        let convs = (0..num_convs)
            .map(|i| {
                let in_channels = if i == 0 { in_channels } else { out_channels };
                Conv2dConfig::new([in_channels, out_channels], [3, 3])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device)
            })
            .collect();

        Self {
            convs,
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self
            .convs
            .iter()
            .fold(x, |x, conv| self.relu.forward(conv.forward(x)));
        self.pool.forward(x)
    }
}

/// Thirteen convolutions in five blocks
#[derive(Module, Debug)]
pub struct Vgg16<B: Backend> {
    blocks: Vec<VggBlock<B>>,
}

impl<B: Backend> Vgg16<B> {
    pub const OUT_CHANNELS: usize = 512;

    pub fn new(device: &B::Device) -> Self {
        let mut in_channels = 3;
        let blocks = BLOCKS
            .iter()
            .map(|&(out_channels, num_convs)| {
                let block = VggBlock::new(in_channels, out_channels, num_convs, device);
                in_channels = out_channels;
                block
            })
            .collect();

        Self { blocks }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }

    pub fn visit_blocks<V: BlockVisitor<B>>(&self, visitor: &mut V) {
        for (i, block) in self.blocks.iter().enumerate() {
            visitor.block(&format!("block{}", i + 1), block);
        }
    }
}
