use std::path::Path;

use burn::data::dataset::{Dataset, InMemDataset};
use ndarray::Array2;
use ndarray_npy::{ReadNpyError, read_npy};
use rand::SeedableRng;
use rand::prelude::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const WIDTH: usize = 28;
const HEIGHT: usize = 28;

/// Category holding the examples labeled 1.
pub const POSITIVE_CATEGORY: &str = "flower";

/// Categories whose examples are all labeled 0.
pub const NEGATIVE_CATEGORIES: [&str; 5] = ["sun", "face", "house", "tree", "car"];

/// Fraction of the shuffled examples that goes to the training split.
pub const TRAIN_FRACTION: f64 = 0.8;

/// A single 28x28 grayscale sketch with its binary label.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SketchItem {
    /// Raw pixel intensities in `[0, 255]`, row major.
    pub image: [[u8; WIDTH]; HEIGHT],

    /// 1 for the positive category, 0 for everything else.
    pub label: u8,
}

/// Error type for [SketchDataset](SketchDataset).
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A bitmap file could not be read.
    #[error("failed to read `{0}`: {1}")]
    Read(String, ReadNpyError),

    /// A bitmap file does not hold 28x28 images.
    #[error("category `{0}`: rows of {1} pixels are not {WIDTH}x{HEIGHT} bitmaps")]
    UnexpectedShape(String, usize),
}

/// Load one category's persisted bitmaps and attach `label` to every sketch.
pub fn load_category(
    data_dir: impl AsRef<Path>,
    category: &str,
    label: u8,
) -> Result<Vec<SketchItem>, DatasetError> {
    let path = data_dir.as_ref().join(format!("{category}.npy"));
    let bitmaps: Array2<u8> =
        read_npy(&path).map_err(|err| DatasetError::Read(path.display().to_string(), err))?;

    if bitmaps.ncols() != WIDTH * HEIGHT {
        return Err(DatasetError::UnexpectedShape(
            category.to_string(),
            bitmaps.ncols(),
        ));
    }

    let items = bitmaps
        .rows()
        .into_iter()
        .map(|row| {
            let mut image = [[0u8; WIDTH]; HEIGHT];
            for (i, pixel) in row.iter().enumerate() {
                image[i / WIDTH][i % WIDTH] = *pixel;
            }
            SketchItem { image, label }
        })
        .collect();

    Ok(items)
}

/// Load every category, assign the binary labels, and interleave the classes
/// with a single seeded permutation of the combined examples.
///
/// The positive category is required. A negative category that cannot be read
/// is skipped, matching the acquisition stage's policy for failed downloads.
pub fn assemble(
    data_dir: impl AsRef<Path>,
    positive: &str,
    negatives: &[&str],
    seed: u64,
) -> Result<Vec<SketchItem>, DatasetError> {
    let data_dir = data_dir.as_ref();

    let mut items = load_category(data_dir, positive, 1)?;
    println!("✓ Loaded {} {positive} sketches", items.len());

    for category in negatives {
        match load_category(data_dir, category, 0) {
            Ok(negative_items) => {
                println!("✓ Loaded {} {category} sketches", negative_items.len());
                items.extend(negative_items);
            }
            Err(err) => eprintln!("✗ Skipping category {category}: {err}"),
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    Ok(items)
}

/// Split the examples at `floor(train_fraction * n)`.
///
/// The two parts are disjoint and cover the input; their internal order is
/// whatever the shuffle produced.
pub fn holdout_split(
    mut items: Vec<SketchItem>,
    train_fraction: f64,
) -> (Vec<SketchItem>, Vec<SketchItem>) {
    let split = (train_fraction * items.len() as f64).floor() as usize;
    let test = items.split_off(split);
    (items, test)
}

/// One split of the labeled Quick Draw sketches, held in memory.
pub struct SketchDataset {
    dataset: InMemDataset<SketchItem>,
}

impl Dataset<SketchItem> for SketchDataset {
    fn get(&self, index: usize) -> Option<SketchItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl SketchDataset {
    pub fn new(items: Vec<SketchItem>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::write_npy;

    fn write_category(dir: &Path, category: &str, count: usize, fill: u8) {
        let bitmaps = Array2::<u8>::from_elem((count, WIDTH * HEIGHT), fill);
        write_npy(dir.join(format!("{category}.npy")), &bitmaps).unwrap();
    }

    #[test]
    fn holdout_split_uses_floor() {
        let items = vec![
            SketchItem {
                image: [[0; WIDTH]; HEIGHT],
                label: 0
            };
            10_001
        ];
        let (train, test) = holdout_split(items, TRAIN_FRACTION);

        assert_eq!(train.len(), 8_000);
        assert_eq!(test.len(), 2_001);
    }

    #[test]
    fn rows_become_square_bitmaps() {
        let dir = tempfile::tempdir().unwrap();
        let mut bitmaps = Array2::<u8>::zeros((3, WIDTH * HEIGHT));
        bitmaps[[1, 0]] = 11;
        bitmaps[[1, WIDTH]] = 22;
        bitmaps[[1, WIDTH * HEIGHT - 1]] = 33;
        write_npy(dir.path().join("flower.npy"), &bitmaps).unwrap();

        let items = load_category(dir.path(), "flower", 1).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[1].image[0][0], 11);
        assert_eq!(items[1].image[1][0], 22);
        assert_eq!(items[1].image[HEIGHT - 1][WIDTH - 1], 33);
        assert!(items.iter().all(|item| item.label == 1));
    }

    #[test]
    fn wrong_row_length_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bitmaps = Array2::<u8>::zeros((4, 100));
        write_npy(dir.path().join("sun.npy"), &bitmaps).unwrap();

        let result = load_category(dir.path(), "sun", 0);

        assert!(matches!(result, Err(DatasetError::UnexpectedShape(_, 100))));
    }

    #[test]
    fn missing_positive_category_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = assemble(dir.path(), "flower", &["sun"], 42);

        assert!(matches!(result, Err(DatasetError::Read(_, _))));
    }

    #[test]
    fn missing_negative_category_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_category(dir.path(), "flower", 10, 255);

        let items = assemble(dir.path(), "flower", &["sun", "car"], 42).unwrap();

        assert_eq!(items.len(), 10);
        assert!(items.iter().all(|item| item.label == 1));
    }

    #[test]
    fn shuffle_is_a_permutation_of_the_labels() {
        let dir = tempfile::tempdir().unwrap();
        write_category(dir.path(), "flower", 500, 255);
        write_category(dir.path(), "sun", 300, 1);
        write_category(dir.path(), "car", 200, 2);

        let items = assemble(dir.path(), "flower", &["sun", "car"], 7).unwrap();

        assert_eq!(items.len(), 1_000);
        let positives = items.iter().filter(|item| item.label == 1).count();
        assert_eq!(positives, 500);
        assert_eq!(items.len() - positives, 500);
        // The seeded shuffle actually interleaves: the positives all come
        // first before shuffling, so at least one must have moved past them.
        assert!(items[..500].iter().any(|item| item.label == 0));
    }

    #[test]
    fn full_assembly_scenario() {
        let dir = tempfile::tempdir().unwrap();
        write_category(dir.path(), "flower", 5_000, 255);
        for (index, category) in NEGATIVE_CATEGORIES.iter().enumerate() {
            write_category(dir.path(), category, 1_000, index as u8);
        }

        let items = assemble(dir.path(), POSITIVE_CATEGORY, &NEGATIVE_CATEGORIES, 42).unwrap();
        assert_eq!(items.len(), 10_000);

        let (train, test) = holdout_split(items, TRAIN_FRACTION);
        assert_eq!(train.len(), 8_000);
        assert_eq!(test.len(), 2_000);

        let dataset = SketchDataset::new(train);
        assert_eq!(dataset.len(), 8_000);
        assert!(dataset.get(0).is_some());
        assert!(dataset.get(8_000).is_none());
    }
}
