use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::{Tensor, backend::Backend},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Cnn, CnnConfig};
use crate::training::TrainingConfig;

/// Upper bound on the size of a single weight shard.
const MAX_SHARD_BYTES: usize = 4 * 1024 * 1024;

/// Error type for the export stage.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The trained artifact could not be restored.
    #[error("failed to load trained artifact: {0}")]
    Artifact(String),

    /// A parameter tensor could not be read back as floats.
    #[error("failed to read weights: {0}")]
    Weights(String),

    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest could not be serialized.
    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// One tensor entry of the weights manifest.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WeightSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
}

/// A group of weight tensors together with the shard files storing them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WeightsGroup {
    pub paths: Vec<String>,
    pub weights: Vec<WeightSpec>,
}

/// Manifest describing an exported model for a browser runtime.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ModelManifest {
    pub format: String,
    pub generated_by: String,
    pub model: CnnConfig,
    pub weights_manifest: Vec<WeightsGroup>,
}

/// Restores the trained artifact and re-serializes it under `out_dir` as a
/// manifest plus binary weight shards.
pub fn export_trained<B: Backend>(
    artifact_dir: &str,
    out_dir: impl AsRef<Path>,
    device: &B::Device,
) -> Result<ModelManifest, ExportError> {
    let config = TrainingConfig::load(format!("{artifact_dir}/config.json"))
        .map_err(|err| ExportError::Artifact(format!("config.json: {err}")))?;
    let record = CompactRecorder::new()
        .load(format!("{artifact_dir}/model").into(), device)
        .map_err(|err| ExportError::Artifact(format!("model weights: {err}")))?;

    let model = config.model.init::<B>(device).load_record(record);

    export(&model, config.model, out_dir)
}

/// Writes `model.json` and the `group1-shard{k}of{n}.bin` weight files.
///
/// Tensor data is stored as little-endian f32 in manifest order, split into
/// shards of at most 4 MiB.
pub fn export<B: Backend>(
    model: &Cnn<B>,
    config: CnnConfig,
    out_dir: impl AsRef<Path>,
) -> Result<ModelManifest, ExportError> {
    let out_dir = out_dir.as_ref();
    create_dir_all(out_dir)?;

    let (weights, buffer) = collect_weights(model)?;

    let chunks: Vec<&[u8]> = buffer.chunks(MAX_SHARD_BYTES).collect();
    let total = chunks.len();
    let mut paths = Vec::with_capacity(total);
    for (index, chunk) in chunks.into_iter().enumerate() {
        let file_name = format!("group1-shard{}of{total}.bin", index + 1);
        File::create(out_dir.join(&file_name))?.write_all(chunk)?;
        paths.push(file_name);
    }

    let manifest = ModelManifest {
        format: "web-model".to_string(),
        generated_by: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        model: config,
        weights_manifest: vec![WeightsGroup { paths, weights }],
    };

    let file = File::create(out_dir.join("model.json"))?;
    serde_json::to_writer_pretty(file, &manifest)?;

    Ok(manifest)
}

/// Flattens every parameter of the network, in layer order.
fn collect_weights<B: Backend>(model: &Cnn<B>) -> Result<(Vec<WeightSpec>, Vec<u8>), ExportError> {
    let mut specs = Vec::new();
    let mut buffer = Vec::new();

    tensor_entry("conv1.weight", model.conv1.weight.val(), &mut specs, &mut buffer)?;
    if let Some(bias) = &model.conv1.bias {
        tensor_entry("conv1.bias", bias.val(), &mut specs, &mut buffer)?;
    }
    tensor_entry("conv2.weight", model.conv2.weight.val(), &mut specs, &mut buffer)?;
    if let Some(bias) = &model.conv2.bias {
        tensor_entry("conv2.bias", bias.val(), &mut specs, &mut buffer)?;
    }
    tensor_entry("fc1.weight", model.fc1.weight.val(), &mut specs, &mut buffer)?;
    if let Some(bias) = &model.fc1.bias {
        tensor_entry("fc1.bias", bias.val(), &mut specs, &mut buffer)?;
    }
    tensor_entry("fc2.weight", model.fc2.weight.val(), &mut specs, &mut buffer)?;
    if let Some(bias) = &model.fc2.bias {
        tensor_entry("fc2.bias", bias.val(), &mut specs, &mut buffer)?;
    }

    Ok((specs, buffer))
}

fn tensor_entry<B: Backend, const D: usize>(
    name: &str,
    tensor: Tensor<B, D>,
    specs: &mut Vec<WeightSpec>,
    buffer: &mut Vec<u8>,
) -> Result<(), ExportError> {
    let shape = tensor.dims().to_vec();
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| ExportError::Weights(format!("{name}: {err:?}")))?;

    for value in &values {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    specs.push(WeightSpec {
        name: name.to_string(),
        shape,
        dtype: "float32".to_string(),
    });

    Ok(())
}
