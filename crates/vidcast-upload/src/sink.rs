//! Commit/rollback boundary to the persisted video record.
//!
//! A [`SessionSink`] is taken at the start of an upload and consumed by
//! exactly one terminal write: [`SessionSink::commit`],
//! [`SessionSink::rollback`] or [`SessionSink::restore`]. A session dropped
//! without one spawns a best-effort restore of the snapshot.

use std::sync::Arc;
use vidcast_core::models::{Enrichment, RecordPatch, StreamValue};
use vidcast_core::UploadResult;
use vidcast_storage::RecordStore;

/// Writes stream fields of one document
#[derive(Clone)]
pub struct RecordSink {
    store: Arc<dyn RecordStore>,
    document_id: String,
}

impl RecordSink {
    pub fn new(store: Arc<dyn RecordStore>, document_id: impl Into<String>) -> Self {
        Self {
            store,
            document_id: document_id.into(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub async fn load(&self) -> UploadResult<StreamValue> {
        Ok(self.store.load(&self.document_id).await?)
    }

    /// Start an upload session, remembering the record as it is now.
    pub async fn begin(&self) -> UploadResult<SessionSink> {
        let snapshot = self.load().await?;
        Ok(SessionSink {
            sink: self.clone(),
            snapshot,
            cleared: false,
            settled: false,
        })
    }

    /// Unset every stream field after a confirmed remote delete.
    pub async fn clear(&self) -> UploadResult<()> {
        self.write(RecordPatch::Clear).await?;
        Ok(())
    }

    async fn write(&self, patch: RecordPatch) -> UploadResult<StreamValue> {
        Ok(self.store.apply(&self.document_id, patch).await?)
    }
}

/// Record access for a single upload session
pub struct SessionSink {
    sink: RecordSink,
    snapshot: StreamValue,
    cleared: bool,
    settled: bool,
}

impl SessionSink {
    /// The record before this session touched it.
    pub fn snapshot(&self) -> &StreamValue {
        &self.snapshot
    }

    /// Drop identifiers of a previous upload so nothing points at a video
    /// that is about to be replaced. Skipped when there is nothing to clear.
    pub async fn clear_stale(&mut self) -> UploadResult<()> {
        if self.cleared || !self.snapshot.has_identifiers() {
            return Ok(());
        }
        self.sink.write(RecordPatch::Clear).await?;
        self.cleared = true;
        tracing::debug!(
            document_id = %self.sink.document_id,
            previous_playback_id = ?self.snapshot.playback_id(),
            "Cleared stale stream identifiers"
        );
        Ok(())
    }

    /// Write the confirmed identifiers and enrichment as one patch.
    pub async fn commit(
        mut self,
        playback_id: &str,
        asset_id: Option<String>,
        enrichment: Enrichment,
    ) -> UploadResult<StreamValue> {
        self.settled = true;
        let value = StreamValue::committed(playback_id, asset_id, enrichment);
        let stored = self.sink.write(RecordPatch::Set(value)).await?;
        tracing::info!(
            document_id = %self.sink.document_id,
            playback_id = %playback_id,
            asset_id = ?stored.asset_id,
            "Committed stream identifiers"
        );
        Ok(stored)
    }

    /// Clear every stream field after a failed session.
    pub async fn rollback(mut self) -> UploadResult<()> {
        self.settled = true;
        self.sink.write(RecordPatch::Clear).await?;
        tracing::info!(document_id = %self.sink.document_id, "Rolled back stream identifiers");
        Ok(())
    }

    /// Put the record back to its pre-session value after a cancellation.
    pub async fn restore(mut self) -> UploadResult<()> {
        self.settled = true;
        if !self.cleared {
            return Ok(());
        }
        self.sink.write(RecordPatch::restore(&self.snapshot)).await?;
        tracing::debug!(document_id = %self.sink.document_id, "Restored pre-upload record");
        Ok(())
    }
}

impl Drop for SessionSink {
    fn drop(&mut self) {
        if self.settled || !self.cleared {
            return;
        }
        let document_id = self.sink.document_id.clone();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                document_id = %document_id,
                "Upload session dropped outside a runtime, record left cleared"
            );
            return;
        };
        tracing::warn!(
            document_id = %document_id,
            "Upload session dropped before it settled, restoring the record"
        );
        let sink = self.sink.clone();
        let patch = RecordPatch::restore(&self.snapshot);
        runtime.spawn(async move {
            if let Err(err) = sink.write(patch).await {
                tracing::error!(
                    document_id = %document_id,
                    error = %err,
                    "Failed to restore the record of a dropped session"
                );
            }
        });
    }
}
