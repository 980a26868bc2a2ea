use serde::{Deserialize, Serialize};

use super::file::UploadFile;

/// Payload for the create-upload collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateUploadRequest {
    pub filename: String,
    pub filetype: String,
    pub filesize: u64,
}

impl From<&UploadFile> for CreateUploadRequest {
    fn from(file: &UploadFile) -> Self {
        Self {
            filename: file.name.clone(),
            filetype: file.mime_type.clone(),
            filesize: file.size_bytes,
        }
    }
}

/// One-time direct upload slot issued by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadTarget {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    /// Provider-internal identifier used for status and delete calls.
    /// Some providers only assign it after the upload.
    #[serde(rename = "uid")]
    pub asset_id: Option<String>,
}

impl UploadTarget {
    pub fn new(upload_url: impl Into<String>, asset_id: Option<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            asset_id: asset_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }
}
