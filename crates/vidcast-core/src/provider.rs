//! Collaborator traits
//!
//! The upload workflow only talks to the outside world through these seams:
//! [`StreamProvider`] for the three remote API operations and [`Transport`]
//! for moving file bytes to a direct upload target.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::UploadResult;
use crate::models::{AssetStatus, CreateUploadRequest, UploadFile, UploadTarget};

/// Byte-level progress reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_sent: u64,
    pub bytes_total: u64,
}

impl TransferProgress {
    pub fn new(bytes_sent: u64, bytes_total: u64) -> Self {
        Self {
            bytes_sent,
            bytes_total,
        }
    }

    /// Percent of the file acknowledged, 0-100. `None` when the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        if self.bytes_total == 0 {
            return None;
        }
        let ratio = self.bytes_sent as f64 / self.bytes_total as f64;
        Some((ratio * 100.0).round().clamp(0.0, 100.0))
    }
}

/// Called after each measurable transport increment
pub type ProgressCallback<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Remote video provider operations consumed by the upload workflow
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Request a one-time direct upload slot.
    async fn create_upload_target(&self, request: &CreateUploadRequest)
        -> UploadResult<UploadTarget>;

    /// Fetch the processing state of an asset. Non-2xx responses are errors.
    async fn fetch_asset_status(&self, asset_id: &str) -> UploadResult<AssetStatus>;

    /// Delete an asset. Deleting an asset that no longer exists succeeds.
    async fn delete_asset(&self, asset_id: &str) -> UploadResult<()>;
}

/// Moves a local file to a direct upload target
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve once the remote end acknowledged every byte of `file`.
    ///
    /// `cancel` is consulted at chunk boundaries; a triggered token yields
    /// [`crate::UploadError::Cancelled`].
    async fn upload(
        &self,
        target: &UploadTarget,
        file: &UploadFile,
        on_progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> UploadResult<()>;
}
