//! ResNet-50 feature extractor.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use super::BlockVisitor;

const EXPANSION: usize = 4;
/// (bottleneck width, blocks, first stride) per stage
const STAGES: [(usize, usize, usize); 4] = [(64, 3, 1), (128, 4, 2), (256, 6, 2), (512, 3, 2)];

/// Convolution without bias, followed by batch norm
#[derive(Module, Debug)]
pub struct ConvBn<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
}

impl<B: Backend> ConvBn<B> {
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
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(channels[1]).init(device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// 1x1 reduce, 3x3, 1x1 expand, with a residual connection
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    reduce: ConvBn<B>,
    conv: ConvBn<B>,
    expand: ConvBn<B>,
    downsample: Option<ConvBn<B>>,
    relu: Relu,
}

impl<B: Backend> Bottleneck<B> {
    fn new(in_channels: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let out_channels = width * EXPANSION;
        let downsample = (stride != 1 || in_channels != out_channels)
            .then(|| ConvBn::new([in_channels, out_channels], 1, stride, 0, device));

        Self {
            reduce: ConvBn::new([in_channels, width], 1, 1, 0, device),
            conv: ConvBn::new([width, width], 3, stride, 1, device),
            expand: ConvBn::new([width, out_channels], 1, 1, 0, device),
            downsample,
            relu: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(x.clone()),
            None => x.clone(),
        };

        let out = self.relu.forward(self.reduce.forward(x));
        let out = self.relu.forward(self.conv.forward(out));
        let out = self.expand.forward(out);
        self.relu.forward(out + identity)
    }
}

/// Stem and four bottleneck stages of [3, 4, 6, 3] blocks
#[derive(Module, Debug)]
pub struct ResNet50<B: Backend> {
    stem: ConvBn<B>,
    relu: Relu,
    maxpool: MaxPool2d,
    stages: Vec<Vec<Bottleneck<B>>>,
}

impl<B: Backend> ResNet50<B> {
    pub const OUT_CHANNELS: usize = 512 * EXPANSION;

    pub fn new(device: &B::Device) -> Self {
        let mut in_channels = 64;
        let stages = STAGES
            .iter()
            .map(|&(width, num_blocks, stride)| {
                (0..num_blocks)
                    .map(|i| {
                        let block = Bottleneck::new(
                            in_channels,
                            width,
                            if i == 0 { stride } else { 1 },
                            device,
                        );
                        in_channels = width * EXPANSION;
                        block
                    })
                    .collect()
            })
            .collect();

        Self {
            stem: ConvBn::new([3, 64], 7, 2, 3, device),
            relu: Relu::new(),
            maxpool: MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(),
            stages,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.maxpool.forward(self.relu.forward(self.stem.forward(x)));
        self.stages
            .iter()
            .flatten()
            .fold(x, |x, block| block.forward(x))
    }

    pub fn visit_blocks<V: BlockVisitor<B>>(&self, visitor: &mut V) {
        visitor.block("stem", &self.stem);
        for (i, stage) in self.stages.iter().enumerate() {
            visitor.block(&format!("stage{}", i + 1), stage);
        }
    }
}
