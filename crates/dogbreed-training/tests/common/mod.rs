#![allow(dead_code)]

use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use dogbreed_core::{Architecture, InputShape, RunConfig, RunContext, RunId};
use dogbreed_dataset::{DogBreedDataset, DogItem};
use image::{Rgb, RgbImage};

pub type TestBackend = Autodiff<NdArray>;

/// Small, fast configuration: MobileNet on 32x32 images with 2 classes
pub fn small_config(base_dir: &Path) -> RunConfig {
    let mut config = RunConfig::default();
    config.model.architecture = Architecture::MobileNet;
    config.model.input_shape = InputShape::new(32, 32, 3);
    config.model.num_classes = 2;
    config.training.epochs = 1;
    config.training.batch_size = 2;
    config.output.base_dir = base_dir.to_path_buf();
    config
}

pub fn context(config: RunConfig, run_id: &str) -> RunContext {
    RunContext::with_run_id(config, RunId::new(run_id)).unwrap()
}

pub fn dog_image(label: usize, variant: u8) -> RgbImage {
    let base: [u8; 3] = if label == 0 { [200, 60, 40] } else { [40, 90, 210] };
    RgbImage::from_fn(40, 36, |x, y| {
        Rgb([
            base[0].wrapping_add(variant.wrapping_mul(7)),
            base[1].wrapping_add((x * 3) as u8),
            base[2].wrapping_add((y * 2) as u8),
        ])
    })
}

/// `n` examples alternating between two classes
pub fn synthetic_split(n: usize) -> DogBreedDataset {
    DogBreedDataset::from_items(
        (0..n)
            .map(|i| DogItem::new(dog_image(i % 2, i as u8), i % 2))
            .collect(),
    )
}

/// Writes a class-per-directory dataset with two breeds
pub fn write_dataset(root: &Path, train_per_class: usize, test_per_class: usize) {
    let breeds = ["n02085620-Chihuahua", "n02085782-Japanese_spaniel"];
    for (split, per_class) in [("train", train_per_class), ("test", test_per_class)] {
        for (label, breed) in breeds.iter().enumerate() {
            let dir = root.join(split).join(breed);
            std::fs::create_dir_all(&dir).unwrap();
            for i in 0..per_class {
                dog_image(label, i as u8)
                    .save(dir.join(format!("{i}.png")))
                    .unwrap();
            }
        }
    }
}
