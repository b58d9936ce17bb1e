use std::process;

use quickdraw_classification::dataset::{NEGATIVE_CATEGORIES, POSITIVE_CATEGORY};
use quickdraw_classification::download::{
    self, MAX_NEGATIVE_SAMPLES, MAX_POSITIVE_SAMPLES,
};

const DATA_DIR: &str = "data";

fn main() {
    // The positive category is required; the negatives are best-effort.
    match download::fetch_category(DATA_DIR, POSITIVE_CATEGORY, MAX_POSITIVE_SAMPLES) {
        Ok(count) => println!("✓ Downloaded {count} {POSITIVE_CATEGORY} drawings"),
        Err(err) => {
            eprintln!("✗ Failed to download {POSITIVE_CATEGORY}: {err}");
            process::exit(1);
        }
    }

    for category in NEGATIVE_CATEGORIES {
        match download::fetch_category(DATA_DIR, category, MAX_NEGATIVE_SAMPLES) {
            Ok(count) => println!("✓ Downloaded {count} {category} drawings"),
            Err(err) => eprintln!("✗ Failed to download {category}: {err}"),
        }
    }

    println!("\n✓ All data downloaded to '{DATA_DIR}/'");
}
