use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use vidcast_core::models::{RecordPatch, StreamValue};

use crate::traits::{validate_document_id, RecordStore, StorageError, StorageResult};

/// In-process record store
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, StreamValue>>,
    writes: Mutex<Vec<(String, RecordPatch)>>,
    failing_writes: Mutex<usize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document with a value without recording a write.
    pub fn with_record(self, document_id: &str, value: StreamValue) -> Self {
        if let Ok(mut records) = self.records.lock() {
            records.insert(document_id.to_string(), value);
        }
        self
    }

    /// Reject the next `count` writes with a backend error.
    pub fn failing_writes(self, count: usize) -> Self {
        if let Ok(mut failing) = self.failing_writes.lock() {
            *failing = count;
        }
        self
    }

    /// Every patch applied so far, in order.
    pub fn writes(&self) -> Vec<(String, RecordPatch)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

fn poisoned() -> StorageError {
    StorageError::BackendError("record store lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self, document_id: &str) -> StorageResult<StreamValue> {
        validate_document_id(document_id)?;
        let records = self.records.lock().map_err(|_| poisoned())?;
        Ok(records.get(document_id).cloned().unwrap_or_default())
    }

    async fn apply(&self, document_id: &str, patch: RecordPatch) -> StorageResult<StreamValue> {
        validate_document_id(document_id)?;
        {
            let mut failing = self.failing_writes.lock().map_err(|_| poisoned())?;
            if *failing > 0 {
                *failing -= 1;
                return Err(StorageError::BackendError("write rejected".to_string()));
            }
        }
        let value = patch.apply();
        {
            let mut records = self.records.lock().map_err(|_| poisoned())?;
            records.insert(document_id.to_string(), value.clone());
        }
        self.writes
            .lock()
            .map_err(|_| poisoned())?
            .push((document_id.to_string(), patch));
        Ok(value)
    }
}
