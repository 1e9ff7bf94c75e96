//! Trait definitions for perceptual hashing.

use crate::error::HashError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A computed perceptual hash that can be compared
pub trait PerceptualHash: Clone + Send + Sync {
    /// Compute the Hamming distance to another hash
    ///
    /// Returns the number of bits that differ between the two hashes.
    /// Hashes of different widths cannot be compared.
    fn distance(&self, other: &Self) -> Result<u32, HashError>;

    /// Get the raw hash bytes
    fn as_bytes(&self) -> &[u8];

    /// Get the hash as a hexadecimal string
    fn to_hex(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Trait for hash algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Append the hash of `image` to `out`
    fn hash_into(&self, image: &DynamicImage, out: &mut Vec<u8>) -> Result<(), HashError>;

    /// Compute a hash from an already-decoded image
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHashValue, HashError> {
        let mut bytes = Vec::new();
        self.hash_into(image, &mut bytes)?;
        Ok(ImageHashValue::new(bytes))
    }

    /// Short algorithm name for logs
    fn name(&self) -> &'static str;
}

/// Comparable handle over stored fingerprint bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHashValue {
    bytes: Vec<u8>,
}

impl ImageHashValue {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Rebuild a handle from a persisted fingerprint
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl PerceptualHash for ImageHashValue {
    fn distance(&self, other: &Self) -> Result<u32, HashError> {
        if self.bytes.len() != other.bytes.len() {
            return Err(HashError::LengthMismatch {
                left: self.bytes.len(),
                right: other.bytes.len(),
            });
        }

        Ok(self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
