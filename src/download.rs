use std::fs::create_dir_all;
use std::io::Read;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, s};
use ndarray_npy::{ReadNpyError, WriteNpyError, read_npy, write_npy};
use thiserror::Error;

/// Google's hosted Quick Draw bitmap arrays, one `.npy` file per category.
const BASE_URL: &str = "https://storage.googleapis.com/quickdraw_dataset/full/numpy_bitmap";

/// Sample cap for the positive category.
pub const MAX_POSITIVE_SAMPLES: usize = 5_000;

/// Sample cap for each negative category.
pub const MAX_NEGATIVE_SAMPLES: usize = 1_000;

/// Error type for the acquisition stage.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The request could not be sent or the body could not be read.
    #[error("request for `{0}` failed: {1}")]
    Request(String, reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("`{url}` answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded file is not a valid bitmap array.
    #[error("invalid bitmap file: {0}")]
    Read(#[from] ReadNpyError),

    /// The truncated array could not be persisted.
    #[error("failed to persist bitmap file: {0}")]
    Write(#[from] WriteNpyError),
}

fn category_url(category: &str) -> String {
    format!("{BASE_URL}/{category}.npy")
}

/// Download one category's bitmaps and persist them to
/// `{data_dir}/{category}.npy`, keeping at most `max_samples` sketches.
///
/// The network round-trip is skipped when the file is already on disk; the
/// sample cap is applied either way. Returns the number of samples kept.
pub fn fetch_category(
    data_dir: impl AsRef<Path>,
    category: &str,
    max_samples: usize,
) -> Result<usize, DownloadError> {
    let data_dir = data_dir.as_ref();
    if !data_dir.exists() {
        create_dir_all(data_dir)?;
    }

    let path = data_dir.join(format!("{category}.npy"));
    if path.exists() {
        log::info!("{category}: already on disk, skipping download");
    } else {
        let url = category_url(category);
        let bytes = download_file_as_bytes(&url, category)?;
        std::fs::write(&path, &bytes)?;
    }

    truncate_bitmaps(&path, max_samples)
}

/// Rewrite the bitmap file with at most `max_samples` rows.
/// Returns the number of rows kept.
fn truncate_bitmaps(path: &Path, max_samples: usize) -> Result<usize, DownloadError> {
    let bitmaps: Array2<u8> = read_npy(path)?;
    let kept = usize::min(bitmaps.nrows(), max_samples);

    if kept < bitmaps.nrows() {
        let capped = bitmaps.slice(s![..kept, ..]).to_owned();
        write_npy(path, &capped)?;
    }

    Ok(kept)
}

/// Download the file at `url` into memory.
/// File download progress is reported with the help of a [progress bar](indicatif).
fn download_file_as_bytes(url: &str, message: &str) -> Result<Vec<u8>, DownloadError> {
    let mut response =
        reqwest::blocking::get(url).map_err(|err| DownloadError::Request(url.to_string(), err))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status,
        });
    }

    let bar = match response.content_length() {
        Some(length) => ProgressBar::new(length),
        None => ProgressBar::new_spinner(),
    };
    bar.set_style(
        ProgressStyle::with_template(
            "{msg} [{wide_bar}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    bar.set_message(message.to_owned());

    let mut bytes = Vec::new();
    let mut buffer = [0u8; 8 * 1024];
    loop {
        let read = response.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&buffer[..read]);
        bar.inc(read as u64);
    }
    bar.finish();

    Ok(bytes)
}
