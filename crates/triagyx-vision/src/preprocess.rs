//! Image preprocessing for the convolutional backbone.
//!
//! Decodes JPEG/PNG payloads, resizes to the backbone's input resolution and
//! normalizes channels with the ImageNet statistics the backbone was trained
//! against. Also carries the 8-bit enhancement helpers (CLAHE, intensity
//! rescale) used on single-channel scans before analysis.

use std::path::Path;

use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::error::Result;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// CLAHE tile grid (8×8) and histogram clip factor.
const CLAHE_GRID: u32 = 8;
const CLAHE_CLIP_FACTOR: f32 = 2.0;

/// Epsilon keeping intensity rescale finite on constant inputs.
const INTENSITY_EPS: f32 = 1e-5;

pub struct ImagePreprocessor {
    target_size: usize,
    device: Device,
}

impl ImagePreprocessor {
    pub fn new(target_size: usize, device: Device) -> Self {
        Self {
            target_size,
            device,
        }
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Decode raw JPEG/PNG bytes into a normalized (1, 3, S, S) tensor.
    pub fn decode(&self, bytes: &[u8]) -> Result<Tensor> {
        let img = image::load_from_memory(bytes)?;
        self.to_tensor(img)
    }

    /// Load and preprocess an image file.
    pub fn load(&self, path: &Path) -> Result<Tensor> {
        let img = image::open(path)?;
        self.to_tensor(img)
    }

    fn to_tensor(&self, img: DynamicImage) -> Result<Tensor> {
        let size = self.target_size;
        let rgb = img
            .resize_exact(size as u32, size as u32, FilterType::Triangle)
            .to_rgb8();
        debug!(size, "image resized for backbone input");

        let mut data = vec![0f32; 3 * size * size];
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                data[c * size * size + y * size + x] =
                    (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
        Ok(Tensor::from_vec(data, (1, 3, size, size), &self.device)?)
    }
}

/// Contrast-limited adaptive histogram equalization on 8-bit grayscale.
///
/// Per-tile histograms are clipped at `CLAHE_CLIP_FACTOR` times the uniform
/// bin height, the excess redistributed, and per-pixel lookups bilinearly
/// interpolated between the four surrounding tile mappings.
pub fn enhance_contrast(img: &GrayImage) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tile_w = width.div_ceil(CLAHE_GRID).max(1);
    let tile_h = height.div_ceil(CLAHE_GRID).max(1);
    let tiles_x = width.div_ceil(tile_w) as usize;
    let tiles_y = height.div_ceil(tile_h) as usize;

    // One 256-entry remap table per tile.
    let mut mappings = vec![[0f32; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx as u32 * tile_w;
            let y0 = ty as u32 * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as u32;
            let limit = ((CLAHE_CLIP_FACTOR * area as f32 / 256.0) as u32).max(1);

            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let bonus = excess / 256;
            let mut remainder = excess % 256;
            for bin in hist.iter_mut() {
                *bin += bonus;
                if remainder > 0 {
                    *bin += 1;
                    remainder -= 1;
                }
            }

            let mapping = &mut mappings[ty * tiles_x + tx];
            let mut cdf = 0u32;
            for v in 0..256 {
                cdf += hist[v];
                mapping[v] = (cdf as f32 / area as f32) * 255.0;
            }
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let v = img.get_pixel(x, y)[0] as usize;

            // Tile-space coordinates centered on tile midpoints.
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
            let tx0 = fx.floor().max(0.0) as usize;
            let ty0 = fy.floor().max(0.0) as usize;
            let tx0 = tx0.min(tiles_x - 1);
            let ty0 = ty0.min(tiles_y - 1);
            let tx1 = (tx0 + 1).min(tiles_x - 1);
            let ty1 = (ty0 + 1).min(tiles_y - 1);
            let wx = (fx - tx0 as f32).clamp(0.0, 1.0);
            let wy = (fy - ty0 as f32).clamp(0.0, 1.0);

            let top = mappings[ty0 * tiles_x + tx0][v] * (1.0 - wx)
                + mappings[ty0 * tiles_x + tx1][v] * wx;
            let bottom = mappings[ty1 * tiles_x + tx0][v] * (1.0 - wx)
                + mappings[ty1 * tiles_x + tx1][v] * wx;
            let blended = top * (1.0 - wy) + bottom * wy;
            out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Rescale grayscale intensities to the full [0, 255] range.
/// Constant images map to zero instead of dividing by zero.
pub fn normalize_intensity(img: &GrayImage) -> GrayImage {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for pixel in img.pixels() {
        min = min.min(pixel[0]);
        max = max.max(pixel[0]);
    }
    let range = (max as f32 - min as f32) + INTENSITY_EPS;

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let scaled = ((pixel[0] as f32 - min as f32) / range) * 255.0;
        pixel[0] = scaled.round().clamp(0.0, 255.0) as u8;
    }
    out
}
