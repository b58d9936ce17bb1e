use std::process;

use burn::backend::{Autodiff, NdArray, ndarray::NdArrayDevice};
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;

use quickdraw_classification::dataset::{
    self, NEGATIVE_CATEGORIES, POSITIVE_CATEGORY, TRAIN_FRACTION,
};
use quickdraw_classification::inference;
use quickdraw_classification::model::CnnConfig;
use quickdraw_classification::training::{self, TrainingConfig};

const DATA_DIR: &str = "data";
const ARTIFACT_DIR: &str = "artifacts";
const NUM_SAMPLE_PREDICTIONS: usize = 5;

type MyBackend = NdArray<f32>;
type MyAutodiffBackend = Autodiff<MyBackend>;

fn main() {
    let device = NdArrayDevice::Cpu;
    let config = TrainingConfig::new(CnnConfig::new(), AdamConfig::new());
    let batch_size = config.batch_size;

    println!("Loading data...");
    let items = match dataset::assemble(DATA_DIR, POSITIVE_CATEGORY, &NEGATIVE_CATEGORIES, config.seed)
    {
        Ok(items) => items,
        Err(err) => {
            eprintln!("✗ {err}");
            process::exit(1);
        }
    };

    let (train_items, test_items) = dataset::holdout_split(items, TRAIN_FRACTION);
    println!("Training set: {} samples", train_items.len());
    println!("Test set: {} samples", test_items.len());

    println!("\nTraining model...");
    let model =
        training::train::<MyAutodiffBackend>(ARTIFACT_DIR, config, train_items, device.clone());

    // Evaluate on the inner backend, where dropout is inactive.
    let model = model.valid();
    let accuracy = inference::evaluate(&model, &test_items, batch_size, &device);
    println!("Test accuracy: {:.2}%", accuracy * 100.0);

    println!("\nTesting predictions...");
    let samples = &test_items[..test_items.len().min(NUM_SAMPLE_PREDICTIONS)];
    for (index, prediction) in inference::predict(&model, samples, &device).iter().enumerate() {
        println!(
            "Sample {}: Predicted={} ({:.1}%), Actual={}",
            index + 1,
            inference::class_name(prediction.label),
            prediction.confidence * 100.0,
            inference::class_name(prediction.actual),
        );
    }
}
