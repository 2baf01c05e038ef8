//! Binding a split to a target shape, class count and batch size.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::Backend;
use dogbreed_core::{Error, InputShape, Result};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::batcher::{DogBatch, DogBreedBatcher};
use crate::dataset::DogBreedDataset;
use crate::preprocess::{one_hot, to_pixels};

/// A preprocessed example: HWC pixels in [0, 1] and a one-hot label
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedExample {
    pub image: Vec<f32>,
    pub label: Vec<f32>,
}

/// A split ready for batched iteration
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    dataset: DogBreedDataset,
    shape: InputShape,
    num_classes: usize,
    batch_size: usize,
}

/// Binds a split to a target shape, class count and batch size.
///
/// Labels are checked against `num_classes` here; images are decoded and
/// preprocessed when a batch is built.
pub fn prepare(
    split: DogBreedDataset,
    shape: InputShape,
    num_classes: usize,
    batch_size: usize,
) -> Result<PreparedSplit> {
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch_size must be greater than 0".to_string()));
    }
    if num_classes == 0 {
        return Err(Error::InvalidArgument("num_classes must be greater than 0".to_string()));
    }
    if shape.height == 0 || shape.width == 0 {
        return Err(Error::InvalidArgument(format!("Input shape {shape} has an empty dimension")));
    }
    if shape.channels != 3 {
        return Err(Error::InvalidArgument(format!(
            "Input shape {shape} must have 3 (RGB) channels"
        )));
    }
    if let Some(label) = split.labels().find(|&label| label >= num_classes) {
        return Err(Error::Dataset(format!(
            "Label {label} out of range for {num_classes} classes"
        )));
    }

    debug!(
        "Prepared split: {} examples, shape {}, {} classes, batch size {}",
        split.num_examples(),
        shape,
        num_classes,
        batch_size
    );

    Ok(PreparedSplit {
        dataset: split,
        shape,
        num_classes,
        batch_size,
    })
}

impl PreparedSplit {
    pub fn num_examples(&self) -> usize {
        self.dataset.num_examples()
    }

    pub fn num_batches(&self) -> usize {
        self.num_examples().div_ceil(self.batch_size)
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sequential example order
    pub fn order(&self) -> Vec<usize> {
        (0..self.num_examples()).collect()
    }

    /// Example order shuffled with the given generator
    pub fn shuffled_order(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut order = self.order();
        order.shuffle(rng);
        order
    }

    /// Decode and preprocess the examples at `indices`, in parallel
    pub fn examples(&self, indices: &[usize]) -> Result<Vec<PreparedExample>> {
        indices
            .par_iter()
            .map(|&index| -> Result<PreparedExample> {
                let item = self.dataset.load_item(index)?;
                Ok(PreparedExample {
                    image: to_pixels(&item.image, self.shape),
                    label: one_hot(item.label, self.num_classes)?,
                })
            })
            .collect()
    }

    /// Build the batches of `order`, in order; the last one may be smaller
    pub fn batches<'a, B: Backend>(
        &'a self,
        order: &'a [usize],
        batcher: &'a DogBreedBatcher<B>,
    ) -> impl Iterator<Item = Result<DogBatch<B>>> + 'a {
        order
            .chunks(self.batch_size)
            .map(move |indices| -> Result<DogBatch<B>> {
                Ok(batcher.batch(self.examples(indices)?))
            })
    }

    /// Batcher matching this split's shape and class count
    pub fn batcher<B: Backend>(&self, device: B::Device) -> DogBreedBatcher<B> {
        DogBreedBatcher::new(device, self.shape, self.num_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DogItem;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};
    use rand::SeedableRng;

    type TestBackend = NdArray;

    fn split(n: usize, num_classes: usize) -> DogBreedDataset {
        DogBreedDataset::from_items(
            (0..n)
                .map(|i| DogItem::new(RgbImage::from_pixel(300, 250, Rgb([i as u8, 0, 0])), i % num_classes))
                .collect(),
        )
    }

    #[test]
    fn test_batch_shapes_with_smaller_final_batch() {
        let prepared = prepare(split(33, 120), InputShape::imagenet(), 120, 32).unwrap();
        assert_eq!(prepared.num_batches(), 2);

        let batcher = prepared.batcher::<TestBackend>(Default::default());
        let order = prepared.order();
        let batches: Vec<_> = prepared
            .batches(&order, &batcher)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].images.dims(), [32, 224, 224, 3]);
        assert_eq!(batches[0].labels.dims(), [32, 120]);
        assert_eq!(batches[1].images.dims(), [1, 224, 224, 3]);
        assert_eq!(batches[1].labels.dims(), [1, 120]);
    }

    #[test]
    fn test_examples_are_one_hot() {
        let prepared = prepare(split(3, 3), InputShape::new(8, 8, 3), 3, 2).unwrap();
        let examples = prepared.examples(&[2, 0]).unwrap();

        assert_eq!(examples[0].label, vec![0.0, 0.0, 1.0]);
        assert_eq!(examples[1].label, vec![1.0, 0.0, 0.0]);
        assert_eq!(examples[0].image.len(), 8 * 8 * 3);
    }

    #[test]
    fn test_label_out_of_range_is_rejected() {
        let err = prepare(split(4, 4), InputShape::new(8, 8, 3), 2, 2).unwrap_err();
        assert!(matches!(err, Error::Dataset(_)));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(prepare(split(2, 2), InputShape::new(8, 8, 3), 2, 0).is_err());
    }

    #[test]
    fn test_non_rgb_or_empty_shape_is_rejected() {
        let err = prepare(split(2, 2), InputShape::new(4, 4, 1), 2, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = prepare(split(2, 2), InputShape::new(0, 4, 3), 2, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_shuffled_order_is_seeded_permutation() {
        let prepared = prepare(split(10, 2), InputShape::new(8, 8, 3), 2, 4).unwrap();

        let a = prepared.shuffled_order(&mut ChaCha8Rng::seed_from_u64(0));
        let b = prepared.shuffled_order(&mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, prepared.order());
    }

    #[test]
    fn test_empty_split_has_no_batches() {
        let prepared = prepare(DogBreedDataset::default(), InputShape::new(8, 8, 3), 2, 4).unwrap();
        assert_eq!(prepared.num_batches(), 0);
    }
}
