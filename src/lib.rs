//! Flower vs. non-flower classification of Quick Draw sketches.
//!
//! The pipeline runs as three stages that communicate through files on disk:
//!
//! - `download`: fetch per-category bitmap arrays from the Quick Draw store,
//!   capped to a fixed number of samples per category.
//! - `train`: assemble the labeled dataset, fit a small convolutional
//!   network, and report test accuracy.
//! - `export`: re-serialize the trained model for a browser runtime as a
//!   manifest plus binary weight shards.
//!
//! Each stage has a matching binary under `src/bin/`.

pub mod data;
pub mod dataset;
pub mod download;
pub mod export;
pub mod inference;
pub mod model;
pub mod training;
