use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::dataset::SketchItem;

#[derive(Clone, Default)]
pub struct SketchBatcher;

#[derive(Clone, Debug)]
pub struct SketchBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, SketchItem, SketchBatch<B>> for SketchBatcher {
    fn batch(&self, items: Vec<SketchItem>, device: &B::Device) -> SketchBatch<B> {
        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data(
                    TensorData::from([(item.label as i64).elem::<B::IntElem>()]),
                    device,
                )
            })
            .collect();

        let images = items
            .into_iter()
            .map(|item| TensorData::from(item.image))
            .map(|data| Tensor::<B, 2>::from_data(data.convert::<B::FloatElem>(), device))
            .map(|tensor| tensor.reshape([1, 28, 28]))
            .map(|tensor| tensor / 255) // normalize between [0, 1]
            .collect();

        let images = Tensor::stack(images, 0);
        let targets = Tensor::cat(targets, 0);

        SketchBatch { images, targets }
    }
}
