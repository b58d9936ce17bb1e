use burn::{
    nn::{
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    prelude::*,
};

/// Features left after the two conv/pool blocks collapse a 28x28 input
/// to 64 channels of 5x5.
const FLATTENED: usize = 64 * 5 * 5;

/// Small convolutional network mapping grayscale sketches to one logit.
#[derive(Module, Debug)]
pub struct Cnn<B: Backend> {
    pub conv1: Conv2d<B>,
    pub pool1: MaxPool2d,
    pub conv2: Conv2d<B>,
    pub pool2: MaxPool2d,
    pub dropout: Dropout,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub activation: Relu,
}

#[derive(Config, Debug)]
pub struct CnnConfig {
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 0.3)]
    pub dropout: f64,
}

impl CnnConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Cnn<B> {
        Cnn {
            conv1: Conv2dConfig::new([1, 32], [3, 3]).init(device),
            pool1: MaxPool2dConfig::new([2, 2]).init(),
            conv2: Conv2dConfig::new([32, 64], [3, 3]).init(device),
            pool2: MaxPool2dConfig::new([2, 2]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc1: LinearConfig::new(FLATTENED, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, 1).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> Cnn<B> {
    /// Maps `[batch, 1, 28, 28]` images to one raw logit per image.
    ///
    /// The sigmoid is left to the loss during training and applied
    /// explicitly at prediction time.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images); // [batch, 32, 26, 26]
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x); // [batch, 32, 13, 13]

        let x = self.conv2.forward(x); // [batch, 64, 11, 11]
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x); // [batch, 64, 5, 5]

        let x = x.reshape([batch_size, FLATTENED]);
        let x = self.dropout.forward(x);
        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        self.fc2.forward(x) // [batch, 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn forward_produces_one_logit_per_image() {
        let device = Default::default();
        let model: Cnn<TestBackend> = CnnConfig::new().init(&device);

        let images = Tensor::<TestBackend, 4>::zeros([4, 1, 28, 28], &device);
        let output = model.forward(images);

        assert_eq!(output.dims(), [4, 1]);
    }

    #[test]
    fn config_defaults_match_the_pipeline() {
        let config = CnnConfig::new();

        assert_eq!(config.hidden_size, 128);
        assert_eq!(config.dropout, 0.3);
    }
}
