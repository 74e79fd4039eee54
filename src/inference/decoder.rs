//! Image decoding and normalization
//!
//! Turns uploaded image bytes into the fixed-shape tensor the classifier
//! consumes: `[1, size, size, 3]`, RGB, values in `[0, 1]`.

use image::{imageops::FilterType, RgbImage};

use crate::utils::error::{InferenceError, Result};

/// Resampling filter used for the square resize (bicubic)
const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// A single preprocessed image with a leading batch dimension of 1
///
/// Data is stored row-major in NHWC order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    size: usize,
    data: Vec<f32>,
}

impl NormalizedImage {
    /// Build from an RGB image that is already `size`×`size`
    fn from_rgb(rgb: &RgbImage) -> Self {
        let size = rgb.width() as usize;
        let data = rgb
            .pixels()
            .flat_map(|p| p.0)
            .map(|v| v as f32 / 255.0)
            .collect();

        Self { size, data }
    }

    /// Tensor shape: `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        [1, self.size, self.size, 3]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at (row, column, channel) of the single batch entry
    pub fn get(&self, y: usize, x: usize, channel: usize) -> Option<f32> {
        if y >= self.size || x >= self.size || channel >= 3 {
            return None;
        }
        self.data.get((y * self.size + x) * 3 + channel).copied()
    }
}

/// Decodes encoded images into [`NormalizedImage`]s of a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDecoder {
    image_size: u32,
}

impl ImageDecoder {
    pub fn new(image_size: u32) -> Result<Self> {
        if image_size == 0 {
            return Err(InferenceError::Config(
                "image size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { image_size })
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Decode, force RGB, resize to the configured square and scale to [0, 1]
    pub fn decode(&self, bytes: &[u8]) -> Result<NormalizedImage> {
        if bytes.is_empty() {
            return Err(InferenceError::Decode("image payload is empty".to_string()));
        }

        let image =
            image::load_from_memory(bytes).map_err(|e| InferenceError::Decode(e.to_string()))?;

        let rgb = image.to_rgb8();
        let resized = image::imageops::resize(&rgb, self.image_size, self.image_size, RESIZE_FILTER);

        Ok(NormalizedImage::from_rgb(&resized))
    }
}
