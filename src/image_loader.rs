//! Screenshot loading for callers that start from files on disk.
//!
//! The pipeline itself only sees base64 strings; this module is the CLI's
//! stand-in for the screenshot provider.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageError, ImageOutputFormat};
use thiserror::Error;

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Failed to load image: {0}")]
    Load(#[from] ImageError),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

pub fn load_image(path: &Path) -> Result<DynamicImage, ImageLoadError> {
    if !path.exists() {
        return Err(ImageLoadError::NotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ImageLoadError::UnsupportedExtension(ext));
    }
    Ok(image::open(path)?)
}

/// Shrink `img` so its longest side is at most `max_dimension`, keeping aspect ratio.
pub fn downscale_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_dimension && h <= max_dimension {
        return img;
    }
    img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

pub fn encode_png_base64(img: &DynamicImage) -> Result<String, ImageLoadError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .map_err(|e| ImageLoadError::Encode(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&buf))
}

/// Load a screenshot from disk and return it as base64 PNG ready for upload.
pub fn screenshot_to_base64(path: &Path, max_dimension: u32) -> Result<String, ImageLoadError> {
    let img = downscale_to_fit(load_image(path)?, max_dimension);
    encode_png_base64(&img)
}
