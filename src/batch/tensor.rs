//! Image to tensor conversion
//!
//! Pixels are visited in raster order (top row first, left to right) and read
//! as 16-bit RGBA samples, so 8-bit sources are widened by 257.

use image::{DynamicImage, Rgba};
use serde::Serialize;

use crate::config::ColorMode;
use crate::error::Result;

/// `{"instances": ...}` as expected by the model server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorPayload {
    pub instances: Instances,
}

/// A single instance, either flat luminance or per-pixel RGB triplets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Instances {
    Grayscale(Vec<Vec<u8>>),
    Color(Vec<Vec<[u8; 3]>>),
}

impl TensorPayload {
    /// Number of pixels carried by the payload
    pub fn pixel_count(&self) -> usize {
        match &self.instances {
            Instances::Grayscale(rows) => rows.iter().map(Vec::len).sum(),
            Instances::Color(rows) => rows.iter().map(Vec::len).sum(),
        }
    }
}

/// Decode image bytes and encode them as a tensor.
///
/// A malformed image is an error, never an empty tensor.
pub fn encode_bytes(bytes: &[u8], mode: ColorMode) -> Result<TensorPayload> {
    let image = image::load_from_memory(bytes)?;
    Ok(encode(&image, mode))
}

/// Encode an already decoded image
pub fn encode(image: &DynamicImage, mode: ColorMode) -> TensorPayload {
    let pixels = image.to_rgba16();

    let instances = match mode {
        ColorMode::Grayscale => {
            Instances::Grayscale(vec![pixels.pixels().map(luminance).collect()])
        }
        ColorMode::Color => Instances::Color(vec![pixels.pixels().map(rgb8).collect()]),
    };

    TensorPayload { instances }
}

/// `round((0.299R + 0.587G + 0.114B) / 256)` over 16-bit samples, alpha ignored
pub fn luminance(pixel: &Rgba<u16>) -> u8 {
    let [r, g, b, _] = pixel.0;
    let lum = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    // Full white lands at 255.996
    (lum / 256.0).round().min(255.0) as u8
}

/// 16-bit samples narrowed back to 8-bit, alpha dropped
pub fn rgb8(pixel: &Rgba<u16>) -> [u8; 3] {
    let [r, g, b, _] = pixel.0;
    [(r / 257) as u8, (g / 257) as u8, (b / 257) as u8]
}
