use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::{
    data::{SketchBatch, SketchBatcher},
    dataset::SketchItem,
    model::Cnn,
};

/// Outcome of a single thresholded prediction.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Predicted label: 1 when the sigmoid output exceeds 0.5.
    pub label: u8,
    /// Probability of the winning class.
    pub confidence: f32,
    /// Ground-truth label carried over from the item.
    pub actual: u8,
}

/// Human-readable name of a binary label.
pub fn class_name(label: u8) -> &'static str {
    if label == 1 { "Flower" } else { "Not Flower" }
}

/// Runs the network on `items` and thresholds the sigmoid output at 0.5.
pub fn predict<B: Backend>(
    model: &Cnn<B>,
    items: &[SketchItem],
    device: &B::Device,
) -> Vec<Prediction> {
    if items.is_empty() {
        return Vec::new();
    }

    let actuals: Vec<u8> = items.iter().map(|item| item.label).collect();
    let batch: SketchBatch<B> = SketchBatcher.batch(items.to_vec(), device);

    let probabilities = sigmoid(model.forward(batch.images))
        .squeeze::<1>(1)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .expect("Sigmoid outputs should convert to a flat vector");

    probabilities
        .into_iter()
        .zip(actuals)
        .map(|(probability, actual)| {
            let label = u8::from(probability > 0.5);
            let confidence = if probability > 0.5 {
                probability
            } else {
                1.0 - probability
            };
            Prediction {
                label,
                confidence,
                actual,
            }
        })
        .collect()
}

/// Fraction of `items` the model classifies correctly.
pub fn evaluate<B: Backend>(
    model: &Cnn<B>,
    items: &[SketchItem],
    batch_size: usize,
    device: &B::Device,
) -> f32 {
    let correct: usize = items
        .chunks(batch_size)
        .map(|chunk| {
            predict(model, chunk, device)
                .iter()
                .filter(|prediction| prediction.label == prediction.actual)
                .count()
        })
        .sum();

    correct as f32 / items.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CnnConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn items(count: usize) -> Vec<SketchItem> {
        (0..count)
            .map(|index| SketchItem {
                image: [[(index % 256) as u8; 28]; 28],
                label: (index % 2) as u8,
            })
            .collect()
    }

    #[test]
    fn predictions_report_the_winning_class_probability() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device);

        let predictions = predict(&model, &items(6), &device);

        assert_eq!(predictions.len(), 6);
        for prediction in &predictions {
            assert!(prediction.label == 0 || prediction.label == 1);
            assert!((0.5..=1.0).contains(&prediction.confidence));
        }
    }

    #[test]
    fn predict_on_no_items_is_empty() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device);

        assert!(predict(&model, &[], &device).is_empty());
    }

    #[test]
    fn accuracy_is_a_fraction() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device);

        let accuracy = evaluate(&model, &items(10), 4, &device);

        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn class_names_match_the_categories() {
        assert_eq!(class_name(1), "Flower");
        assert_eq!(class_name(0), "Not Flower");
    }
}
