use std::{env, process};

use burn::backend::NdArray;

use quickdraw_classification::export;

const ARTIFACT_DIR: &str = "artifacts";
const OUTPUT_DIR: &str = "model";

// Basic backend type (not used for computation).
type B = NdArray<f32>;

fn main() {
    let args: Vec<String> = env::args().collect();
    let artifact_dir = args.get(1).map(String::as_str).unwrap_or(ARTIFACT_DIR);
    let output_dir = args.get(2).map(String::as_str).unwrap_or(OUTPUT_DIR);

    println!("Converting model to web format...");

    let device = Default::default();
    match export::export_trained::<B>(artifact_dir, output_dir, &device) {
        Ok(manifest) => {
            let shards = &manifest.weights_manifest[0].paths;
            println!("✓ Model converted and saved to '{output_dir}/'");
            println!("✓ Wrote model.json and {}", shards.join(", "));
        }
        Err(err) => {
            eprintln!("✗ {err}");
            process::exit(1);
        }
    }
}
