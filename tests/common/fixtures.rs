use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgb};
use plc::ClassCountMap;

/// Writes a 32x32 red JPEG called `name` into `dir` and returns its path.
pub fn create_test_image(dir: &Path, name: &str) -> PathBuf {
    let img = ImageBuffer::from_fn(32, 32, |_, _| Rgb([255u8, 0u8, 0u8]));
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Jpeg)
        .expect("Failed to save test image");
    path
}

/// Writes a placeholder weights file; its contents are never read.
pub fn create_model_file(dir: &Path) -> PathBuf {
    let path = dir.join("model.pt");
    std::fs::write(&path, b"weights").expect("Failed to write model file");
    path
}

/// Writes a minimal dataset descriptor.
pub fn create_dataset(dir: &Path) -> PathBuf {
    let path = dir.join("data.yaml");
    std::fs::write(
        &path,
        "path: datasets/cars\ntrain: images/train\nval: images/val\nnames:\n  0: car\n  1: person\n",
    )
    .expect("Failed to write dataset descriptor");
    path
}

/// Names of `dir` entries ending with `suffix`, in directory-listing order.
pub fn listing_order(dir: &Path, suffix: &str) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("Failed to list directory")
        .map(|e| e.expect("Failed to read entry").file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(suffix))
        .collect()
}

pub fn counts(pairs: &[(&str, u32)]) -> ClassCountMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}
