//! # Hasher Module
//!
//! Decodes images and computes their perceptual fingerprints.
//!
//! ## How It Works
//! 1. Infer the format from file content and decode to pixels
//! 2. Resize to a small grayscale grid (9x8 for the default dHash)
//! 3. Compute a 64-bit hash from neighbouring pixel gradients
//! 4. Compare hashes using Hamming distance
//!
//! ## Performance Optimizations
//! - Uses `zune-jpeg` for faster JPEG decoding
//! - Uses `fast_image_resize` for SIMD-accelerated resizing
//! - Memory-maps large files

mod algorithms;
pub mod decode;
pub mod fast_resize;
mod traits;

pub use algorithms::{DifferenceHasher, DEFAULT_HASH_SIZE};
pub use decode::{decode, FileBytes};
pub use traits::{HashAlgorithm, ImageHashValue, PerceptualHash};
