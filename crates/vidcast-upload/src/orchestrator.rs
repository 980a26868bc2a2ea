//! End-to-end upload workflow.
//!
//! One [`UploadOrchestrator`] owns at most one session at a time. Starting an
//! upload cancels the session in flight and waits for its teardown before the
//! new one begins. Status changes are published on a `watch` channel.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vidcast_core::format::default_thumbnail_url;
use vidcast_core::models::{AssetStatus, CreateUploadRequest, Enrichment, StreamValue, UploadFile};
use vidcast_core::{
    ErrorMetadata, LogLevel, StreamProvider, TransferProgress, Transport, UploadConfig,
    UploadError, UploadResult,
};

use crate::poller::{ReadyAsset, StatusPoller};
use crate::sink::{RecordSink, SessionSink};
use crate::state::{UploadEvent, UploadStatus};

/// How an upload session ended without an error
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The record now holds the committed value
    Completed(StreamValue),
    /// Cancelled by the caller or superseded by a newer upload
    Cancelled,
}

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
}

/// Tears a session down when its future is dropped before it settled.
///
/// Fields drop after `Drop::drop` runs, so the session lock is released only
/// once the status has been reset.
struct SessionGuard<'a> {
    orchestrator: &'a UploadOrchestrator,
    active: Option<(Uuid, CancellationToken)>,
    lock: Option<tokio::sync::MutexGuard<'a, ()>>,
    settled: bool,
}

impl<'a> SessionGuard<'a> {
    fn new(
        orchestrator: &'a UploadOrchestrator,
        active: Option<(Uuid, CancellationToken)>,
    ) -> Self {
        Self {
            orchestrator,
            active,
            lock: None,
            settled: false,
        }
    }

    fn hold(&mut self, lock: tokio::sync::MutexGuard<'a, ()>) {
        self.lock = Some(lock);
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            if let Some((session_id, cancel)) = &self.active {
                tracing::warn!(session_id = %session_id, "Upload dropped before it settled");
                cancel.cancel();
            }
            if self.lock.is_some() {
                self.orchestrator.reset_interrupted();
            }
        }
        if let Some((session_id, _)) = &self.active {
            self.orchestrator.release_active_session(*session_id);
        }
    }
}

pub struct UploadOrchestrator {
    provider: Arc<dyn StreamProvider>,
    transport: Arc<dyn Transport>,
    sink: RecordSink,
    config: UploadConfig,
    status: watch::Sender<UploadStatus>,
    active: Mutex<Option<ActiveSession>>,
    session: tokio::sync::Mutex<()>,
}

fn log_failure(err: &UploadError, operation: &str) {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error = %err, code, operation, "Upload workflow failed"),
        LogLevel::Warn => tracing::warn!(error = %err, code, operation, "Upload workflow failed"),
        LogLevel::Error => tracing::error!(error = %err, code, operation, "Upload workflow failed"),
    }
}

impl UploadOrchestrator {
    pub fn new(
        provider: Arc<dyn StreamProvider>,
        transport: Arc<dyn Transport>,
        sink: RecordSink,
        config: UploadConfig,
    ) -> Self {
        let (status, _) = watch::channel(UploadStatus::default());
        Self {
            provider,
            transport,
            sink,
            config,
            status,
            active: Mutex::new(None),
            session: tokio::sync::Mutex::new(()),
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> UploadStatus {
        self.status.borrow().clone()
    }

    /// Receive every status change from now on.
    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.status.subscribe()
    }

    pub fn document_id(&self) -> &str {
        self.sink.document_id()
    }

    /// Cancel the session in flight. Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        match self.active.lock() {
            Ok(active) => match active.as_ref() {
                Some(session) if !session.cancel.is_cancelled() => {
                    tracing::info!(session_id = %session.id, "Cancelling upload");
                    session.cancel.cancel();
                    true
                }
                _ => false,
            },
            Err(_) => false,
        }
    }

    /// Upload `file`, wait for processing and commit the playback id.
    ///
    /// Cancellation is reported as [`UploadOutcome::Cancelled`], not an error.
    #[tracing::instrument(
        skip(self, file),
        fields(
            session_id = tracing::field::Empty,
            document_id = %self.sink.document_id(),
            file = %file.name,
            size_bytes = file.size_bytes
        )
    )]
    pub async fn upload(&self, file: UploadFile) -> UploadResult<UploadOutcome> {
        let session_id = Uuid::new_v4();
        tracing::Span::current().record("session_id", tracing::field::display(session_id));

        let cancel = self.replace_active_session(session_id)?;
        let mut guard = SessionGuard::new(self, Some((session_id, cancel.clone())));
        guard.hold(self.session.lock().await);

        if cancel.is_cancelled() {
            tracing::debug!("Upload superseded before it started");
            guard.settle();
            return Ok(UploadOutcome::Cancelled);
        }

        self.reset_interrupted();
        let result = self.run_session(&file, &cancel).await;
        guard.settle();
        result
    }

    /// Delete the asset referenced by the record, then clear the record.
    ///
    /// An empty record resets to idle without calling the provider. The
    /// record is only cleared once the provider confirmed the delete.
    #[tracing::instrument(skip(self), fields(document_id = %self.sink.document_id()))]
    pub async fn delete_existing(&self) -> UploadResult<()> {
        let Ok(lock) = self.session.try_lock() else {
            return Err(UploadError::InvalidTransition {
                from: self.status().stage.to_string(),
                event: UploadEvent::DeleteRequested.name(),
            });
        };
        let mut guard = SessionGuard::new(self, None);
        guard.hold(lock);

        self.reset_interrupted();
        let result = self.run_delete().await;
        guard.settle();
        result
    }

    async fn run_delete(&self) -> UploadResult<()> {
        self.dispatch(UploadEvent::DeleteRequested)?;

        let record = match self.sink.load().await {
            Ok(record) => record,
            Err(err) => return self.delete_failed(err),
        };

        if record.is_empty() {
            tracing::debug!("Record holds no stream fields, nothing to delete");
            self.dispatch(UploadEvent::Deleted)?;
            return Ok(());
        }

        let Some(asset_id) = record.stored_asset_id() else {
            return self.delete_failed(UploadError::MissingStoredAsset);
        };

        if let Err(err) = self.provider.delete_asset(asset_id).await {
            return self.delete_failed(err);
        }

        if let Err(err) = self.clear_after_delete(asset_id).await {
            return self.delete_failed(err);
        }

        tracing::info!(asset_id = %asset_id, "Stream asset deleted and record cleared");
        self.dispatch(UploadEvent::Deleted)?;
        Ok(())
    }

    /// Clear the record of an asset the provider already deleted. One failed
    /// write is retried before the stale reference is reported.
    async fn clear_after_delete(&self, asset_id: &str) -> UploadResult<()> {
        let Err(first) = self.sink.clear().await else {
            return Ok(());
        };
        tracing::warn!(
            asset_id = %asset_id,
            error = %first,
            "Clearing the record failed after the asset was deleted, retrying"
        );

        match self.sink.clear().await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(
                    asset_id = %asset_id,
                    error = %err,
                    "Record still references a deleted Stream asset"
                );
                Err(UploadError::Store(format!(
                    "asset {} was deleted but the record still references it: {}",
                    asset_id, err
                )))
            }
        }
    }

    /// Return a stage left behind by a dropped session to idle. Callers hold
    /// the session lock, so no live session owns the status.
    fn reset_interrupted(&self) {
        let stage = self.status.borrow().stage;
        if !stage.is_settled() {
            tracing::warn!(stage = %stage, "Resetting status of an interrupted session");
            let _ = self.dispatch(UploadEvent::Interrupted);
        }
    }

    /// Apply an event to the published status.
    fn dispatch(&self, event: UploadEvent) -> UploadResult<()> {
        let mut outcome = Ok(());
        self.status
            .send_if_modified(|status| match status.apply(event) {
                Ok(next) => {
                    let changed = *status != next;
                    *status = next;
                    changed
                }
                Err(err) => {
                    tracing::error!(error = %err, "Rejected status transition");
                    outcome = Err(err);
                    false
                }
            });
        outcome
    }

    fn replace_active_session(&self, session_id: Uuid) -> UploadResult<CancellationToken> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| UploadError::Internal("session registry lock poisoned".to_string()))?;
        if let Some(previous) = active.take() {
            if !previous.cancel.is_cancelled() {
                tracing::info!(previous_session_id = %previous.id, "Cancelling the upload in flight");
                previous.cancel.cancel();
            }
        }
        let cancel = CancellationToken::new();
        *active = Some(ActiveSession {
            id: session_id,
            cancel: cancel.clone(),
        });
        Ok(cancel)
    }

    fn release_active_session(&self, session_id: Uuid) {
        if let Ok(mut active) = self.active.lock() {
            if matches!(active.as_ref(), Some(current) if current.id == session_id) {
                active.take();
            }
        }
    }

    async fn run_session(
        &self,
        file: &UploadFile,
        cancel: &CancellationToken,
    ) -> UploadResult<UploadOutcome> {
        self.dispatch(UploadEvent::FileSelected {
            name: file.name.clone(),
        })?;

        if let Err(err) = file.ensure_uploadable() {
            return self.fail(err);
        }

        let mut session = match self.sink.begin().await {
            Ok(session) => session,
            Err(err) => return self.fail(err),
        };

        let request = CreateUploadRequest::from(file);
        let created = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.abandon(session, None).await,
            result = self.provider.create_upload_target(&request) => result,
        };
        let target = match created {
            Ok(target) => target,
            Err(err) => return self.fail(err),
        };
        let Some(target_asset_id) = target.asset_id.clone() else {
            return self.fail(UploadError::MissingAssetId);
        };
        tracing::info!(asset_id = %target_asset_id, "Direct upload target created");

        self.dispatch(UploadEvent::TargetObtained)?;
        if let Err(err) = session.clear_stale().await {
            return self.fail(err);
        }

        let on_progress = |progress: TransferProgress| {
            let _ = self.dispatch(UploadEvent::TransferProgress(progress.percent()));
        };
        match self
            .transport
            .upload(&target, file, &on_progress, cancel)
            .await
        {
            Ok(()) => {}
            Err(UploadError::Cancelled) => {
                return self.abandon(session, Some(&target_asset_id)).await
            }
            Err(err) => return self.roll_back(session, err).await,
        }

        self.dispatch(UploadEvent::TransferFinished)?;

        let poller = StatusPoller::from_config(self.provider.clone(), &self.config);
        let on_status = |status: &AssetStatus| {
            let _ = self.dispatch(UploadEvent::ProcessingProgress(status.clone()));
        };
        let ready = match poller
            .wait_until_ready(&target_asset_id, cancel, &on_status)
            .await
        {
            Ok(ready) => ready,
            Err(UploadError::Cancelled) => {
                return self.abandon(session, Some(&target_asset_id)).await
            }
            Err(err) => return self.roll_back(session, err).await,
        };

        let ReadyAsset {
            playback_id,
            status,
            ..
        } = ready;
        let asset_id = status
            .asset_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or(target_asset_id);
        let enrichment = Enrichment {
            duration_seconds: status.duration_seconds,
            thumbnail_url: status
                .thumbnail_url
                .clone()
                .or_else(|| Some(default_thumbnail_url(&playback_id))),
        };

        let committed = match session
            .commit(&playback_id, Some(asset_id), enrichment)
            .await
        {
            Ok(value) => value,
            Err(err) => return self.fail(err),
        };

        self.dispatch(UploadEvent::Completed { playback_id })?;
        Ok(UploadOutcome::Completed(committed))
    }

    fn fail(&self, err: UploadError) -> UploadResult<UploadOutcome> {
        log_failure(&err, "upload");
        let _ = self.dispatch(UploadEvent::failed(&err));
        Err(err)
    }

    async fn roll_back(&self, session: SessionSink, err: UploadError) -> UploadResult<UploadOutcome> {
        if let Err(store_err) = session.rollback().await {
            tracing::error!(error = %store_err, "Failed to roll back the record");
        }
        self.fail(err)
    }

    /// Cancellation path: best-effort remote cleanup, then put the record back.
    async fn abandon(
        &self,
        session: SessionSink,
        asset_id: Option<&str>,
    ) -> UploadResult<UploadOutcome> {
        if let Some(asset_id) = asset_id {
            if let Err(err) = self.provider.delete_asset(asset_id).await {
                tracing::warn!(
                    asset_id = %asset_id,
                    error = %err,
                    "Failed to delete the abandoned asset"
                );
            }
        }

        if let Err(err) = session.restore().await {
            return self.fail(err);
        }

        tracing::info!("Upload cancelled");
        self.dispatch(UploadEvent::Cancelled)?;
        Ok(UploadOutcome::Cancelled)
    }

    fn delete_failed(&self, err: UploadError) -> UploadResult<()> {
        log_failure(&err, "delete");
        let _ = self.dispatch(UploadEvent::DeleteFailed((&err).into()));
        Err(err)
    }
}
