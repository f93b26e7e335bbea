use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::ImageReader;

use crate::gemini::{EncodedImage, VisionModel};
use crate::response::{parse_model_response, Extraction};

/// Read and validate an image file. The bytes are fully decoded so corrupt
/// or mislabeled files are rejected here rather than by the remote API, and
/// the detected format supplies the MIME type for the upload.
pub fn load_image(path: &Path) -> Result<EncodedImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Could not read image: {}", path.display()))?;

    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .context("Could not probe image format")?;
    let format = reader
        .format()
        .with_context(|| format!("Unrecognized image format: {}", path.display()))?;
    let img = reader
        .decode()
        .with_context(|| format!("Could not decode image: {}", path.display()))?;

    println!("  Image size: {}x{}", img.width(), img.height());
    println!("  Image format: {format:?}");

    Ok(EncodedImage {
        mime_type: format.to_mime_type().to_string(),
        data: bytes,
    })
}

/// Analyze one image: load it, send it to the model with the prompt, and
/// normalize the reply. Total by construction — every failure (unreadable
/// file, remote error) folds into the returned [`Extraction`], so one bad
/// image can never abort a batch.
pub async fn analyze_image<M: VisionModel>(model: &M, path: &Path, prompt: &str) -> Extraction {
    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => return Extraction::failed(format!("{e:#}")),
    };

    match model.describe_image(prompt, &image).await {
        Ok(text) => parse_model_response(&text),
        Err(e) => Extraction::failed(format!("{e:#}")),
    }
}

// ── Tests ──
