// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for the hand-landmark network.
//!
//! Images are letterboxed into a square input (aspect ratio kept, borders
//! padded) and converted to a normalized NHWC tensor. [`Letterbox`] maps model
//! coordinates back to the source image.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::imageops;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;
use rayon::prelude::*;

use crate::error::{Result, SignError};

/// Letterbox padding color.
pub const LETTERBOX_COLOR: [u8; 3] = [0, 0, 0];

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Transform applied by [`preprocess_nhwc`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Source image dimensions (height, width).
    pub orig_shape: (u32, u32),
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

impl Letterbox {
    /// Map a point from model input pixels back to source image pixels.
    #[must_use]
    pub fn unproject(&self, x: f32, y: f32) -> (f32, f32) {
        let (scale_y, scale_x) = self.scale;
        let (pad_top, pad_left) = self.padding;
        ((x - pad_left) / scale_x, (y - pad_top) / scale_y)
    }

    /// Map a depth value (same units as x) back to source image pixels.
    #[must_use]
    pub fn unproject_depth(&self, z: f32) -> f32 {
        z / self.scale.1
    }
}

/// Result of preprocessing an image, containing the tensor and transform info.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Tensor with shape (1, H, W, 3), RGB, values in [0, 1].
    pub tensor: Array4<f32>,
    /// Transform needed to map outputs back.
    pub letterbox: Letterbox,
}

/// Letterbox an image into a `size x size` square NHWC tensor.
///
/// # Errors
///
/// Returns an image error if the image is empty.
pub fn preprocess_nhwc(image: &DynamicImage, size: usize) -> Result<PreprocessResult> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SignError::ImageError("cannot preprocess an empty image".to_string()));
    }

    let (new_w, new_h, pad_left, pad_top, scale) =
        calculate_letterbox_params(width, height, (size, size));

    let resized = resize_rgb(image, new_w.max(1), new_h.max(1))?;
    let mut canvas = RgbImage::from_pixel(size as u32, size as u32, Rgb(LETTERBOX_COLOR));
    imageops::overlay(&mut canvas, &resized, i64::from(pad_left), i64::from(pad_top));

    Ok(PreprocessResult {
        tensor: image_to_tensor_nhwc(&canvas)?,
        letterbox: Letterbox {
            orig_shape: (height, width),
            scale,
            padding: (pad_top as f32, pad_left as f32),
        },
    })
}

/// Calculate letterbox parameters for resizing.
///
/// Returns `(new_width, new_height, pad_left, pad_top, (scale_y, scale_x))`.
fn calculate_letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target_size: (usize, usize),
) -> (u32, u32, u32, u32, (f32, f32)) {
    let (target_h, target_w) = (target_size.0 as f32, target_size.1 as f32);
    let (orig_h, orig_w) = (orig_height as f32, orig_width as f32);

    let scale = (target_h / orig_h).min(target_w / orig_w);

    let new_w = (orig_w * scale).round() as u32;
    let new_h = (orig_h * scale).round() as u32;

    let pad_w = (target_size.1 as u32).saturating_sub(new_w);
    let pad_h = (target_size.0 as u32).saturating_sub(new_h);

    // Centered
    let pad_left = pad_w / 2;
    let pad_top = pad_h / 2;

    let scale_x = new_w as f32 / orig_w;
    let scale_y = new_h as f32 / orig_h;

    (new_w, new_h, pad_left, pad_top, (scale_y, scale_x))
}

/// Bilinear resize of an image to `width x height` RGB.
fn resize_rgb(image: &DynamicImage, width: u32, height: u32) -> Result<RgbImage> {
    let (src_w, src_h) = image.dimensions();
    let src = Image::from_vec_u8(src_w, src_h, image.to_rgb8().into_raw(), PixelType::U8x3)
        .map_err(|e| SignError::ImageError(format!("Failed to wrap source image: {e}")))?;
    let mut dst = Image::new(width, height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .map_err(|e| SignError::ImageError(format!("Failed to resize image: {e}")))?;

    RgbImage::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| SignError::ImageError("Resized buffer has the wrong size".to_string()))
}

/// Convert an RGB image to a normalized NHWC tensor, one row per task.
fn image_to_tensor_nhwc(image: &RgbImage) -> Result<Array4<f32>> {
    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Err(SignError::ImageError("cannot build a tensor from an empty image".to_string()));
    }

    let row_len = width * 3;
    let mut data = vec![0.0_f32; row_len * height];
    data.par_chunks_exact_mut(row_len)
        .zip(image.as_raw().par_chunks_exact(row_len))
        .for_each(|(dst, src)| {
            for (d, &p) in dst.iter_mut().zip(src) {
                *d = f32::from(p) * INV_255;
            }
        });

    Array4::from_shape_vec((1, height, width, 3), data)
        .map_err(|e| SignError::ImageError(format!("Failed to build input tensor: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_params_square() {
        let (new_w, new_h, pad_left, pad_top, _scale) =
            calculate_letterbox_params(640, 640, (224, 224));

        assert_eq!(new_w, 224);
        assert_eq!(new_h, 224);
        assert_eq!(pad_left, 0);
        assert_eq!(pad_top, 0);
    }

    #[test]
    fn test_letterbox_params_wide() {
        let (new_w, new_h, pad_left, pad_top, _) =
            calculate_letterbox_params(640, 320, (224, 224));

        assert_eq!(new_w, 224);
        assert_eq!(new_h, 112);
        assert_eq!(pad_left, 0);
        assert_eq!(pad_top, 56);
    }

    #[test]
    fn test_tensor_shape_and_range() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([255, 0, 0])));
        let result = preprocess_nhwc(&image, 32).unwrap();

        assert_eq!(result.tensor.shape(), &[1, 32, 32, 3]);
        assert!(result.tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        // padded row is black, center row is red
        assert!(result.tensor[[0, 0, 16, 0]].abs() < 1e-6);
        assert!((result.tensor[[0, 16, 16, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unproject_inverts_letterbox() {
        let image = DynamicImage::new_rgb8(640, 320);
        let letterbox = preprocess_nhwc(&image, 224).unwrap().letterbox;

        // image center lands on the input center
        let (x, y) = letterbox.unproject(112.0, 112.0);
        assert!((x - 320.0).abs() < 1e-3);
        assert!((y - 160.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = DynamicImage::new_rgb8(0, 0);
        assert!(preprocess_nhwc(&image, 224).is_err());
    }
}
