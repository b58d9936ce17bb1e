use crate::{
    data::{SketchBatch, SketchBatcher},
    dataset::{SketchDataset, SketchItem},
    model::{Cnn, CnnConfig},
};
use burn::{
    config::Config,
    data::dataloader::DataLoaderBuilder,
    module::Module,
    nn::loss::BinaryCrossEntropyLossConfig,
    optim::AdamConfig,
    record::CompactRecorder,
    tensor::{
        Int, Tensor,
        backend::{AutodiffBackend, Backend},
    },
    train::{
        ClassificationOutput, LearnerBuilder, TrainOutput, TrainStep, ValidStep,
        metric::LossMetric,
    },
};

impl<B: Backend> Cnn<B> {
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&output.device())
            .forward(output.clone().squeeze::<1>(1), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

impl<B: AutodiffBackend> TrainStep<SketchBatch<B>, ClassificationOutput<B>> for Cnn<B> {
    fn step(&self, batch: SketchBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.images, batch.targets);

        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<SketchBatch<B>, ClassificationOutput<B>> for Cnn<B> {
    fn step(&self, batch: SketchBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch.images, batch.targets)
    }
}

#[derive(Config)]
pub struct TrainingConfig {
    pub model: CnnConfig,
    pub optimizer: AdamConfig,
    #[config(default = 10)]
    pub num_epochs: usize,
    #[config(default = 128)]
    pub batch_size: usize,
    #[config(default = 4)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 0.001)]
    pub learning_rate: f64,
    /// Fraction of the training items held out for validation during training.
    #[config(default = 0.2)]
    pub valid_fraction: f64,
}

/// Number of items actually fit on, once the validation tail is held out.
fn fit_count(total: usize, valid_fraction: f64) -> usize {
    total - (valid_fraction * total as f64).floor() as usize
}

/// Fits the network on `items` and persists the configuration and trained
/// weights under `artifact_dir`. Returns the trained model.
pub fn train<B: AutodiffBackend>(
    artifact_dir: &str,
    config: TrainingConfig,
    items: Vec<SketchItem>,
    device: B::Device,
) -> Cnn<B> {
    std::fs::create_dir_all(artifact_dir).ok();
    config
        .save(format!("{artifact_dir}/config.json"))
        .expect("Config should be saved successfully");

    B::seed(config.seed);

    // Items arrive shuffled; the validation holdout takes the tail.
    let mut fit_items = items;
    let valid_items = fit_items.split_off(fit_count(fit_items.len(), config.valid_fraction));

    // Dataloaders
    let batcher = SketchBatcher::default();

    let dataloader_train = DataLoaderBuilder::new(batcher.clone())
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(SketchDataset::new(fit_items));

    let dataloader_valid = DataLoaderBuilder::new(batcher)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(SketchDataset::new(valid_items));

    let learner = LearnerBuilder::new(artifact_dir)
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .with_file_checkpointer(CompactRecorder::new())
        .devices(vec![device.clone()])
        .num_epochs(config.num_epochs)
        .summary()
        .build(
            config.model.init::<B>(&device),
            config.optimizer.init(),
            config.learning_rate,
        );

    let model_trained = learner.fit(dataloader_train, dataloader_valid);

    model_trained
        .clone()
        .save_file(format!("{artifact_dir}/model"), &CompactRecorder::new())
        .expect("Trained model should be saved successfully");

    model_trained
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn config_defaults_match_the_pipeline() {
        let config = TrainingConfig::new(CnnConfig::new(), AdamConfig::new());

        assert_eq!(config.num_epochs, 10);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.seed, 42);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.valid_fraction, 0.2);
    }

    #[test]
    fn validation_holdout_takes_the_tail_fifth() {
        assert_eq!(fit_count(8_000, 0.2), 6_400);
        assert_eq!(fit_count(10, 0.2), 8);
        assert_eq!(fit_count(0, 0.2), 0);
    }

    #[test]
    fn classification_output_carries_a_scalar_loss() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device);

        let images = Tensor::<TestBackend, 4>::zeros([2, 1, 28, 28], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 0], &device);

        let output = model.forward_classification(images, targets);

        assert_eq!(output.loss.dims(), [1]);
        assert_eq!(output.output.dims(), [2, 1]);
        assert_eq!(output.targets.dims(), [2]);
    }
}
