//! Dog breed dataset loading and preprocessing library.
//!
//! Loads the train and test splits from a class-per-directory layout and
//! prepares them as batched tensors for Burn.

pub mod batcher;
pub mod dataset;
pub mod loader;
pub mod prepare;
pub mod preprocess;

pub use batcher::{DogBatch, DogBreedBatcher, IMAGENET_MEAN, IMAGENET_STD};
pub use dataset::{DogBreedDataset, DogItem};
pub use loader::{breed_name, load, DatasetMetadata};
pub use prepare::{prepare, PreparedExample, PreparedSplit};
pub use preprocess::{center_crop, one_hot, to_pixels};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batcher::*;
    pub use crate::dataset::*;
    pub use crate::loader::*;
    pub use crate::prepare::*;
}
