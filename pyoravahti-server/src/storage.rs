//! Local disk storage for uploaded bike photos.
//!
//! Files are written as `{uuid}.{ext}` under the upload directory and
//! served from `/uploads/`.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// URL prefix uploaded files are served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
}

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the file and return its public URL.
    pub async fn save(&self, data: &[u8], extension: &str) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(self.root.join(&file_name), data).await?;

        tracing::debug!(file = %file_name, bytes = data.len(), "Stored upload");
        Ok(format!("{}/{}", UPLOADS_URL_PREFIX, file_name))
    }

    /// Remove a previously stored file by its public URL. Unknown files are ignored.
    pub async fn delete(&self, url: &str) -> io::Result<()> {
        let Some(file_name) = url
            .strip_prefix(UPLOADS_URL_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|name| is_plain_file_name(name))
        else {
            return Ok(());
        };

        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

/// File extension for an upload: taken from the client file name when it is
/// a short alphanumeric suffix, otherwise derived from the MIME type.
pub fn file_extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        match content_type {
            Some("image/png") => "png",
            Some("image/gif") => "gif",
            Some("image/webp") => "webp",
            _ => DEFAULT_EXTENSION,
        }
        .to_string()
    })
}
