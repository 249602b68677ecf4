//! Image fingerprints for visual similarity.
//!
//! A fingerprint is a 64-bit blockhash of the bike's primary photo, stored as
//! 16 lowercase hex characters. Re-encoded, resized or slightly cropped
//! copies of the same photo land within a few symbols of each other, which
//! is what [`crate::similarity`] measures.

use blockhash::{blockhash64, Blockhash64};
use image::DynamicImage;

use crate::error::{Error, Result};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Computes fingerprints from image data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualHasher;

impl PerceptualHasher {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint raw image bytes (JPEG, PNG, GIF or WebP).
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<String> {
        let image = image::load_from_memory(image_data)
            .map_err(|e| Error::PerceptualHash(format!("Failed to decode image: {}", e)))?;

        Ok(self.hash_image(&image))
    }

    /// Fingerprint an already decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> String {
        let hash: Blockhash64 = blockhash64(image);
        let bytes: [u8; 8] = hash.into();
        hex::encode(bytes)
    }

    /// Whether the bytes look like an image format we can decode.
    pub fn is_supported_format(data: &[u8]) -> bool {
        image::guess_format(data).is_ok()
    }
}

/// Fingerprint image bytes, or `None` if they are not a decodable image.
pub fn compute_phash(image_data: &[u8]) -> Option<String> {
    PerceptualHasher::new().hash_bytes(image_data).ok()
}
