//! Record store abstraction trait
//!
//! This module defines the RecordStore trait that all record backends must implement.

use async_trait::async_trait;
use thiserror::Error;
use vidcast_core::models::{RecordPatch, StreamValue};
use vidcast_core::UploadError;

/// Record store operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid document id: {0}")]
    InvalidKey(String),

    #[error("Corrupt record {document_id}: {reason}")]
    Corrupt { document_id: String, reason: String },

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for record store operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for UploadError {
    fn from(err: StorageError) -> Self {
        UploadError::Store(err.to_string())
    }
}

/// Record store abstraction trait
///
/// Every write is one [`RecordPatch`] applied atomically: readers observe
/// either the previous value or the patched one, never a mix.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current stream fields of a document. Unknown documents are empty.
    async fn load(&self, document_id: &str) -> StorageResult<StreamValue>;

    /// Apply a patch and return the resulting value.
    async fn apply(&self, document_id: &str, patch: RecordPatch) -> StorageResult<StreamValue>;
}

/// Reject ids that could escape a backend's namespace.
pub(crate) fn validate_document_id(document_id: &str) -> StorageResult<()> {
    if document_id.is_empty()
        || document_id.contains("..")
        || document_id.contains('/')
        || document_id.contains('\\')
        || document_id.starts_with('.')
    {
        return Err(StorageError::InvalidKey(format!(
            "Document id contains invalid characters: {}",
            document_id
        )));
    }
    Ok(())
}
