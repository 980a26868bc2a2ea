use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use vidcast_core::models::{RecordPatch, StreamValue};

use crate::traits::{validate_document_id, RecordStore, StorageError, StorageResult};

/// Local filesystem record store: one JSON file per document
#[derive(Clone, Debug)]
pub struct LocalRecordStore {
    base_path: PathBuf,
}

impl LocalRecordStore {
    /// Create a new LocalRecordStore instance
    ///
    /// # Arguments
    /// * `base_path` - Directory holding the record files (e.g., "./.vidcast/records")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create record directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalRecordStore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, document_id: &str) -> StorageResult<PathBuf> {
        validate_document_id(document_id)?;
        Ok(self.base_path.join(format!("{}.json", document_id)))
    }

    /// Write to a temporary sibling, then rename over the record.
    async fn write_atomically(&self, path: &Path, contents: &[u8]) -> StorageResult<()> {
        let tmp_path = path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));

        let mut file = fs::File::create(&tmp_path).await?;
        if let Err(e) = file.write_all(contents).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for LocalRecordStore {
    async fn load(&self, document_id: &str) -> StorageResult<StreamValue> {
        let path = self.record_path(document_id)?;

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StreamValue::default())
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| StorageError::Corrupt {
            document_id: document_id.to_string(),
            reason: e.to_string(),
        })
    }

    async fn apply(&self, document_id: &str, patch: RecordPatch) -> StorageResult<StreamValue> {
        let path = self.record_path(document_id)?;
        let value = patch.apply();

        let contents = serde_json::to_vec_pretty(&value)
            .map_err(|e| StorageError::BackendError(format!("Failed to encode record: {}", e)))?;
        self.write_atomically(&path, &contents).await?;

        tracing::debug!(
            document_id = %document_id,
            cleared = value.is_empty(),
            "Record written"
        );

        Ok(value)
    }
}
