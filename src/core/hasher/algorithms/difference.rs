//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to (hash_size+1) x hash_size grayscale
//! 2. Comparing each pixel to the one on its right
//! 3. Setting the bit when the left pixel is brighter
//!
//! Bits are packed most-significant first, row by row.

use super::super::fast_resize::resize_to_grayscale;
use super::super::traits::HashAlgorithm;
use crate::error::HashError;
use image::DynamicImage;

/// Default grid size: 8x8 comparisons, a 64-bit fingerprint
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Difference Hash (dHash) implementation
pub struct DifferenceHasher {
    hash_size: u32,
}

impl DifferenceHasher {
    pub fn new(hash_size: u32) -> Self {
        Self { hash_size }
    }

    /// Width of the produced fingerprint in bytes
    pub fn byte_len(&self) -> usize {
        ((self.hash_size * self.hash_size) as usize).div_ceil(8)
    }
}

impl Default for DifferenceHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_SIZE)
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn hash_into(&self, image: &DynamicImage, out: &mut Vec<u8>) -> Result<(), HashError> {
        let gray = resize_to_grayscale(image, self.hash_size + 1, self.hash_size)?;

        out.reserve(self.byte_len());
        let mut current: u8 = 0;
        let mut filled = 0;

        for y in 0..self.hash_size {
            for x in 0..self.hash_size {
                let brighter = gray.get_pixel(x, y)[0] > gray.get_pixel(x + 1, y)[0];
                current = (current << 1) | u8::from(brighter);
                filled += 1;

                if filled == 8 {
                    out.push(current);
                    current = 0;
                    filled = 0;
                }
            }
        }

        if filled > 0 {
            out.push(current << (8 - filled));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "dHash"
    }
}
