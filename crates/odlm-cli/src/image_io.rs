//! Loads an image file into the row-major 8-bit grayscale buffer
//! [`odlm_core::PixelLayer`] construction consumes.
//!
//! This adapter never touches neuron state; it only produces a buffer and
//! dimensions, optionally resized per [`odlm_core::Config`]'s input-image
//! parameters.

use std::path::Path;

use image::imageops::FilterType;
use odlm_core::Config;

use crate::error::CliResult;

/// A decoded, possibly-resized grayscale image.
pub struct GrayImage {
    /// Row-major 8-bit grayscale pixels.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Load `path`, convert to 8-bit luma, and resize per `config`.
pub fn load_gray(path: impl AsRef<Path>, config: &Config) -> CliResult<GrayImage> {
    let path = path.as_ref();
    let img = image::open(path)?;
    let (orig_w, orig_h) = (img.width(), img.height());
    if orig_w == 0 || orig_h == 0 {
        return Err(anyhow::anyhow!("{} decoded to an empty image (0x0)", path.display()).into());
    }
    let (target_w, target_h) = target_dimensions(config, orig_w, orig_h);

    let resized = if (target_w, target_h) != (orig_w, orig_h) {
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    } else {
        img
    };
    let luma = resized.to_luma8();
    let (width, height) = luma.dimensions();
    Ok(GrayImage {
        data: luma.into_raw(),
        width,
        height,
    })
}

fn target_dimensions(config: &Config, width: u32, height: u32) -> (u32, u32) {
    let p = &config.input_image;
    if p.fixed_input_imgs_size {
        return (p.fixed_input_imgs_width, p.fixed_input_imgs_height);
    }
    if p.resize_img_keep_ratio {
        let longest = width.max(height).max(1);
        let target = p.keep_ratio_longest_img_side;
        if longest == target {
            return (width, height);
        }
        let scale = target as f64 / longest as f64;
        let new_w = ((width as f64) * scale).round().max(1.0) as u32;
        let new_h = ((height as f64) * scale).round().max(1.0) as u32;
        return (new_w, new_h);
    }
    (width, height)
}
