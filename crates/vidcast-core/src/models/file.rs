use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::error::UploadError;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A local file selected for upload
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct UploadFile {
    pub path: PathBuf,
    /// Original filename sent to the provider as metadata
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub name: String,
    pub mime_type: String,
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub size_bytes: u64,
}

impl UploadFile {
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        mime_type: Option<&str>,
        size_bytes: u64,
    ) -> Self {
        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        Self {
            path: path.into(),
            name: name.into(),
            mime_type,
            size_bytes,
        }
    }

    /// Build a handle from a path on disk, guessing the MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(UploadError::InvalidFile(format!(
                "Invalid input: {}",
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path).map_err(|e| {
            UploadError::InvalidFile(format!("Failed to open file {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(UploadError::InvalidFile(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();
        let guessed = mime_guess::from_path(path).first_raw();

        Ok(Self::new(path, name, guessed, metadata.len()))
    }

    /// Validate the handle before any remote resource is requested.
    pub fn ensure_uploadable(&self) -> Result<(), UploadError> {
        if self.size_bytes == 0 {
            return Err(UploadError::InvalidFile(format!(
                "{} is empty",
                self.name
            )));
        }
        self.validate()?;
        Ok(())
    }
}
