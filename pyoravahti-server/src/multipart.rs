//! Multipart form parsing helpers
//!
//! Collects uploaded files from a multipart/form-data request.

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::validate_image;

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type from the multipart field (if provided)
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

/// Parsed multipart form fields
///
/// Every part that carries a filename is treated as a file, whatever its
/// field name. Text parts are ignored.
#[derive(Debug, Default)]
pub struct MultipartFields {
    files: Vec<FileField>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request.
    ///
    /// Each file is screened by type and size as it is read; at most
    /// `max_files` files are kept, later ones are skipped unread.
    pub async fn parse(
        multipart: &mut Multipart,
        max_files: usize,
        max_file_size: usize,
    ) -> Result<Self, ApiError> {
        let mut fields = Self::default();
        let mut skipped = 0usize;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };

            if fields.files.len() >= max_files {
                skipped += 1;
                continue;
            }

            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                .to_vec();

            validate_image(content_type.as_deref(), data.len(), max_file_size)?;

            fields.files.push(FileField {
                data,
                content_type,
                file_name: Some(file_name),
            });
        }

        if skipped > 0 {
            tracing::info!(kept = max_files, skipped, "Ignored files beyond the upload limit");
        }

        Ok(fields)
    }

    /// Uploaded files in request order; errors when there are none.
    pub fn require_files(&self) -> Result<&[FileField], ApiError> {
        if self.files.is_empty() {
            return Err(ApiError::bad_request("No files provided"));
        }
        Ok(&self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_files_missing() {
        let fields = MultipartFields::default();
        let err = fields.require_files().unwrap_err();
        assert_eq!(err.to_string(), "Bad request: No files provided");
    }
}
