//! Content moderation for user submitted reports.
//!
//! Text is screened against a list of banned Finnish words; images are
//! screened by MIME type and size before they are stored or fingerprinted.
//! Rejection messages are shown to the user as is.

use thiserror::Error;

const BANNED_WORDS: &[&str] = &[
    "vittu", "perkele", "helvetti", "saatana", "paska", "mulkku", "huora", "neekeri", "nussi",
];

/// Image MIME types accepted for upload.
pub const ALLOWED_IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Default upload size limit per image (5 MB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Why a piece of content was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Teksti sisältää kiellettyjä sanoja")]
    BannedWords,

    #[error("Kuvatyyppi ei ole sallittu")]
    ImageType,

    #[error("Kuva on liian suuri (max {max_mb}MB)")]
    ImageTooLarge { max_mb: usize },
}

/// Case-insensitive substring check against the banned word list.
pub fn contains_banned_words(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    BANNED_WORDS.iter().any(|word| lower.contains(word))
}

pub fn is_allowed_image_mime_type(mime_type: &str) -> bool {
    ALLOWED_IMAGE_MIME_TYPES.contains(&mime_type)
}

pub fn moderate_text(text: &str) -> Result<(), Rejection> {
    if contains_banned_words(text) {
        return Err(Rejection::BannedWords);
    }
    Ok(())
}

/// Screen an image by declared MIME type and size in bytes.
pub fn moderate_image(mime_type: &str, size: usize, max_bytes: usize) -> Result<(), Rejection> {
    if !is_allowed_image_mime_type(mime_type) {
        return Err(Rejection::ImageType);
    }
    if size > max_bytes {
        return Err(Rejection::ImageTooLarge {
            max_mb: max_bytes / (1024 * 1024),
        });
    }
    Ok(())
}
