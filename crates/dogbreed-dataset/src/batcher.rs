//! Batching of prepared examples into Burn tensors.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use dogbreed_core::InputShape;

use crate::prepare::PreparedExample;

/// ImageNet channel means [R, G, B]
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations [R, G, B]
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A mini-batch in channels-last layout
#[derive(Clone, Debug)]
pub struct DogBatch<B: Backend> {
    /// Images with shape [batch_size, height, width, channels]
    pub images: Tensor<B, 4>,
    /// One-hot labels with shape [batch_size, num_classes]
    pub labels: Tensor<B, 2>,
}

impl<B: Backend> DogBatch<B> {
    pub fn size(&self) -> usize {
        self.images.dims()[0]
    }
}

/// Builds normalized batches on a device
#[derive(Clone, Debug)]
pub struct DogBreedBatcher<B: Backend> {
    device: B::Device,
    shape: InputShape,
    num_classes: usize,
}

impl<B: Backend> DogBreedBatcher<B> {
    pub fn new(device: B::Device, shape: InputShape, num_classes: usize) -> Self {
        Self {
            device,
            shape,
            num_classes,
        }
    }
}

impl<B: Backend> Batcher<PreparedExample, DogBatch<B>> for DogBreedBatcher<B> {
    fn batch(&self, items: Vec<PreparedExample>) -> DogBatch<B> {
        let batch_size = items.len();
        let [height, width, channels] = self.shape.dims();

        let image_data: Vec<f32> = items.iter().flat_map(|item| item.image.iter().copied()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(image_data, [batch_size, height, width, channels]),
            &self.device,
        );

        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_MEAN.to_vec(), [1, 1, 1, 3]),
            &self.device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_STD.to_vec(), [1, 1, 1, 3]),
            &self.device,
        );
        let images = (images - mean) / std;

        let label_data: Vec<f32> = items.iter().flat_map(|item| item.label.iter().copied()).collect();
        let labels = Tensor::<B, 2>::from_floats(
            TensorData::new(label_data, [batch_size, self.num_classes]),
            &self.device,
        );

        DogBatch { images, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_normalization() {
        let shape = InputShape::new(2, 2, 3);
        let batcher = DogBreedBatcher::<TestBackend>::new(Default::default(), shape, 3);

        let items = vec![
            PreparedExample {
                image: [0.485f32, 0.456, 0.406].repeat(4),
                label: vec![1.0, 0.0, 0.0],
            },
            PreparedExample {
                image: vec![0.0; 12],
                label: vec![0.0, 0.0, 1.0],
            },
        ];
        let batch = batcher.batch(items);

        assert_eq!(batch.images.dims(), [2, 2, 2, 3]);
        assert_eq!(batch.labels.dims(), [2, 3]);
        assert_eq!(batch.size(), 2);

        let values: Vec<f32> = batch.images.into_data().to_vec().unwrap();
        // The mean pixel normalizes to zero
        assert!(values[..12].iter().all(|v| v.abs() < 1e-5));
        assert!((values[12] + 0.485 / 0.229).abs() < 1e-4);
    }
}
