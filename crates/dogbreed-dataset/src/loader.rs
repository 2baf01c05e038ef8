//! Dataset loader for the class-per-directory Stanford Dogs layout.
//!
//! ```text
//! data_dir/
//! ├── train/
//! │   ├── n02085620-Chihuahua/
//! │   │   ├── n02085620_10074.jpg
//! │   │   └── ...
//! │   └── ...
//! └── test/
//!     └── ...
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use dogbreed_core::{DataSplit, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::dataset::DogBreedDataset;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Class names and split sizes discovered by [`load`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Class directory names, index = label
    pub class_names: Vec<String>,
    pub train_examples: usize,
    pub test_examples: usize,
}

impl DatasetMetadata {
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Display name of a label with the WordNet prefix stripped
    pub fn breed(&self, label: usize) -> Option<&str> {
        self.class_names.get(label).map(|name| breed_name(name))
    }
}

/// Strips a WordNet id prefix: `n02085620-Chihuahua` becomes `Chihuahua`
pub fn breed_name(dir_name: &str) -> &str {
    match dir_name.split_once('-') {
        Some((prefix, rest))
            if prefix.len() > 1
                && prefix.starts_with('n')
                && prefix[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => dir_name,
    }
}

/// Loads the train and test splits under `data_dir`
pub fn load(data_dir: &Path) -> Result<(DogBreedDataset, DogBreedDataset, DatasetMetadata)> {
    info!("Loading dataset from: {:?}", data_dir);

    if !data_dir.is_dir() {
        return Err(Error::Dataset(format!(
            "Dataset directory does not exist: {}",
            data_dir.display()
        )));
    }

    let train_dir = split_dir(data_dir, DataSplit::Train)?;
    let test_dir = split_dir(data_dir, DataSplit::Test)?;

    let mut classes = BTreeSet::new();
    classes.extend(class_dirs(&train_dir)?);
    classes.extend(class_dirs(&test_dir)?);
    let class_names: Vec<String> = classes.into_iter().collect();

    if class_names.is_empty() {
        return Err(Error::Dataset(format!(
            "No class directories found under {}",
            data_dir.display()
        )));
    }
    info!("Found {} classes", class_names.len());

    let class_to_idx: HashMap<&str, usize> = class_names
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let train_files = collect_files(&train_dir, &class_to_idx);
    let test_files = collect_files(&test_dir, &class_to_idx);
    info!(
        "Loaded {} train and {} test examples",
        train_files.len(),
        test_files.len()
    );

    let metadata = DatasetMetadata {
        class_names,
        train_examples: train_files.len(),
        test_examples: test_files.len(),
    };

    Ok((
        DogBreedDataset::from_files(train_files),
        DogBreedDataset::from_files(test_files),
        metadata,
    ))
}

fn split_dir(data_dir: &Path, split: DataSplit) -> Result<PathBuf> {
    let dir = data_dir.join(split.dir_name());
    if !dir.is_dir() {
        return Err(Error::Dataset(format!(
            "Missing {split} split directory: {}",
            dir.display()
        )));
    }
    Ok(dir)
}

fn class_dirs(split_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(split_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn collect_files(split_dir: &Path, class_to_idx: &HashMap<&str, usize>) -> Vec<(PathBuf, usize)> {
    let mut files = Vec::new();
    let mut classes: Vec<(&str, usize)> = class_to_idx.iter().map(|(k, v)| (*k, *v)).collect();
    classes.sort_by_key(|(_, label)| *label);

    for (class_name, label) in classes {
        let class_dir = split_dir.join(class_name);
        if !class_dir.is_dir() {
            continue;
        }

        let mut class_files: Vec<PathBuf> = WalkDir::new(&class_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|path| is_image(path))
            .collect();
        class_files.sort();

        debug!(
            "Class '{}' (label {}): {} files in {}",
            class_name,
            label,
            class_files.len(),
            split_dir.display()
        );
        files.extend(class_files.into_iter().map(|path| (path, label)));
    }

    files
}
