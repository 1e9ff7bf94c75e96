//! SIMD-accelerated grayscale thumbnails for hashing.
//!
//! Each worker thread keeps its own `Resizer`, so the resize scratch
//! space is allocated once per thread rather than once per image.

use crate::error::HashError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage};
use std::cell::RefCell;

thread_local! {
    static RESIZER: RefCell<Resizer> = RefCell::new(Resizer::new());
}

/// Convert `image` to grayscale and shrink it to `width` x `height`
pub fn resize_to_grayscale(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, HashError> {
    if width == 0 || height == 0 {
        return Err(HashError::ComputationFailed(format!(
            "invalid thumbnail size {width}x{height}"
        )));
    }

    let gray = image.to_luma8();
    let (src_width, src_height) = gray.dimensions();
    if src_width == 0 || src_height == 0 {
        return Err(HashError::ComputationFailed("image has no pixels".to_string()));
    }

    let src = Image::from_vec_u8(src_width, src_height, gray.into_raw(), PixelType::U8)
        .map_err(|e| HashError::ComputationFailed(format!("source buffer: {e}")))?;
    let mut dst = Image::new(width, height, PixelType::U8);

    let options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));

    RESIZER.with(|resizer| {
        resizer
            .borrow_mut()
            .resize(&src, &mut dst, &options)
            .map_err(|e| HashError::ComputationFailed(format!("resize: {e}")))
    })?;

    GrayImage::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| HashError::ComputationFailed("thumbnail buffer size".to_string()))
}
