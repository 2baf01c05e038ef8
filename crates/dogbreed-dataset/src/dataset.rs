//! Indexed (image, label) collections, decoded lazily from disk or held in memory.

use std::path::{Path, PathBuf};

use dogbreed_core::{Error, Result};
use image::{ImageReader, RgbImage};

/// A single decoded example
#[derive(Debug, Clone)]
pub struct DogItem {
    /// RGB pixels at their original resolution
    pub image: RgbImage,
    /// Class index
    pub label: usize,
}

impl DogItem {
    pub fn new(image: RgbImage, label: usize) -> Self {
        Self { image, label }
    }

    /// Decode an image file
    pub fn from_path(path: &Path, label: usize) -> Result<Self> {
        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| Error::Image(format!("Failed to decode {}: {e}", path.display())))?
            .to_rgb8();
        Ok(Self { image, label })
    }
}

#[derive(Debug, Clone)]
enum Sample {
    /// Decoded lazily on access
    File { path: PathBuf, label: usize },
    Memory(DogItem),
}

impl Sample {
    fn label(&self) -> usize {
        match self {
            Sample::File { label, .. } => *label,
            Sample::Memory(item) => item.label,
        }
    }
}

/// One split of the dataset
#[derive(Debug, Clone, Default)]
pub struct DogBreedDataset {
    samples: Vec<Sample>,
}

impl DogBreedDataset {
    /// Build a split of image files, decoded when accessed
    pub fn from_files(files: Vec<(PathBuf, usize)>) -> Self {
        Self {
            samples: files
                .into_iter()
                .map(|(path, label)| Sample::File { path, label })
                .collect(),
        }
    }

    /// Build a split of already decoded images
    pub fn from_items(items: Vec<DogItem>) -> Self {
        Self {
            samples: items.into_iter().map(Sample::Memory).collect(),
        }
    }

    pub fn num_examples(&self) -> usize {
        self.samples.len()
    }

    /// Label of an example without decoding its image
    pub fn label(&self, index: usize) -> Option<usize> {
        self.samples.get(index).map(Sample::label)
    }

    pub fn labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.samples.iter().map(Sample::label)
    }

    /// Number of examples per class, sized by the largest label seen
    pub fn class_distribution(&self) -> Vec<usize> {
        let num_classes = self.labels().max().map(|m| m + 1).unwrap_or(0);
        let mut counts = vec![0usize; num_classes];
        for label in self.labels() {
            counts[label] += 1;
        }
        counts
    }

    /// Load an example, decoding it from disk if needed
    pub fn load_item(&self, index: usize) -> Result<DogItem> {
        match self.samples.get(index) {
            Some(Sample::File { path, label }) => DogItem::from_path(path, *label),
            Some(Sample::Memory(item)) => Ok(item.clone()),
            None => Err(Error::Dataset(format!(
                "Index {index} out of bounds for split of {} examples",
                self.samples.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: usize) -> DogItem {
        DogItem::new(RgbImage::new(4, 4), label)
    }

    #[test]
    fn test_in_memory_split() {
        let dataset = DogBreedDataset::from_items(vec![item(0), item(1), item(1)]);

        assert_eq!(dataset.num_examples(), 3);
        assert_eq!(dataset.label(2), Some(1));
        assert_eq!(dataset.class_distribution(), vec![1, 2]);
        assert_eq!(dataset.load_item(1).unwrap().label, 1);
        assert!(matches!(dataset.load_item(3), Err(Error::Dataset(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dataset =
            DogBreedDataset::from_files(vec![(PathBuf::from("/nonexistent/dog.jpg"), 0)]);

        assert_eq!(dataset.label(0), Some(0));
        assert!(dataset.load_item(0).is_err());
    }

    #[test]
    fn test_lazy_file_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pup.png");
        RgbImage::from_pixel(6, 3, image::Rgb([10, 20, 30])).save(&path).unwrap();

        let dataset = DogBreedDataset::from_files(vec![(path, 4)]);
        let item = dataset.load_item(0).unwrap();

        assert_eq!(item.label, 4);
        assert_eq!(item.image.dimensions(), (6, 3));
        assert_eq!(item.image.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
