use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use vidcast_core::models::{AssetStatus, CreateUploadRequest, UploadFile, UploadTarget};
use vidcast_core::{
    ProgressCallback, StreamProvider, TransferProgress, Transport, UploadError, UploadResult,
};

pub fn pending(state: &str) -> AssetStatus {
    AssetStatus {
        state: Some(state.to_string()),
        ..Default::default()
    }
}

pub fn ready(playback_id: &str) -> AssetStatus {
    AssetStatus {
        state: Some("ready".to_string()),
        ready_to_stream: true,
        playback_id: Some(playback_id.to_string()),
        percent_complete: Some(100.0),
        duration_seconds: Some(61.0),
        ..Default::default()
    }
}

/// Scripted provider. Status responses are served in order and the last one
/// repeats once the script runs out.
pub struct FakeProvider {
    create: Mutex<Result<UploadTarget, (u16, String)>>,
    statuses: Mutex<VecDeque<UploadResult<AssetStatus>>>,
    last_status: Mutex<AssetStatus>,
    delete_error: Mutex<Option<UploadError>>,
    pub create_requests: Mutex<Vec<CreateUploadRequest>>,
    pub status_requests: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            create: Mutex::new(Ok(UploadTarget::new(
                "https://x/y",
                Some("abc".to_string()),
            ))),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(pending("queued")),
            delete_error: Mutex::new(None),
            create_requests: Mutex::new(Vec::new()),
            status_requests: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_target(self, target: UploadTarget) -> Self {
        *self.create.lock().unwrap() = Ok(target);
        self
    }

    pub fn failing_create(self, status: u16, detail: &str) -> Self {
        *self.create.lock().unwrap() = Err((status, detail.to_string()));
        self
    }

    pub fn with_statuses(self, statuses: Vec<UploadResult<AssetStatus>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn failing_delete(self, err: UploadError) -> Self {
        *self.delete_error.lock().unwrap() = Some(err);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_requests.lock().unwrap().len()
    }

    pub fn status_calls(&self) -> usize {
        self.status_requests.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamProvider for FakeProvider {
    async fn create_upload_target(
        &self,
        request: &CreateUploadRequest,
    ) -> UploadResult<UploadTarget> {
        self.create_requests.lock().unwrap().push(request.clone());
        match &*self.create.lock().unwrap() {
            Ok(target) => Ok(target.clone()),
            Err((status, detail)) => Err(UploadError::CreateTarget {
                status: Some(*status),
                detail: detail.clone(),
            }),
        }
    }

    async fn fetch_asset_status(&self, asset_id: &str) -> UploadResult<AssetStatus> {
        self.status_requests
            .lock()
            .unwrap()
            .push(asset_id.to_string());
        match self.statuses.lock().unwrap().pop_front() {
            Some(Ok(status)) => {
                *self.last_status.lock().unwrap() = status.clone();
                Ok(status)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.last_status.lock().unwrap().clone()),
        }
    }

    async fn delete_asset(&self, asset_id: &str) -> UploadResult<()> {
        if let Some(err) = self.delete_error.lock().unwrap().take() {
            return Err(err);
        }
        self.deleted.lock().unwrap().push(asset_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum TransportScript {
    /// Report each percent, then succeed
    Succeed(Vec<Option<u64>>),
    /// Report the percents, then fail
    Fail(Vec<Option<u64>>, u16, String),
    /// Report one chunk, then wait for cancellation
    HangUntilCancelled,
    /// Hang on the first call only; later calls succeed
    HangOnce,
}

pub struct FakeTransport {
    script: TransportScript,
    pub uploads: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new(script: TransportScript) -> Self {
        Self {
            script,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(TransportScript::Succeed(vec![
            Some(25),
            Some(50),
            Some(75),
            Some(100),
        ]))
    }

    pub fn calls(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

/// `None` reports progress against an unknown total.
fn report(on_progress: ProgressCallback<'_>, percent: Option<u64>) {
    match percent {
        Some(p) => on_progress(TransferProgress::new(p, 100)),
        None => on_progress(TransferProgress::new(0, 0)),
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn upload(
        &self,
        target: &UploadTarget,
        _file: &UploadFile,
        on_progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> UploadResult<()> {
        let call = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(target.upload_url.clone());
            uploads.len()
        };

        match &self.script {
            TransportScript::Succeed(steps) => {
                for step in steps {
                    if cancel.is_cancelled() {
                        return Err(UploadError::Cancelled);
                    }
                    report(on_progress, *step);
                }
                Ok(())
            }
            TransportScript::Fail(steps, status, detail) => {
                for step in steps {
                    report(on_progress, *step);
                }
                Err(UploadError::Transport {
                    status: *status,
                    detail: detail.clone(),
                })
            }
            TransportScript::HangUntilCancelled => {
                report(on_progress, Some(10));
                cancel.cancelled().await;
                Err(UploadError::Cancelled)
            }
            TransportScript::HangOnce if call == 1 => {
                report(on_progress, Some(10));
                cancel.cancelled().await;
                Err(UploadError::Cancelled)
            }
            TransportScript::HangOnce => {
                report(on_progress, Some(100));
                Ok(())
            }
        }
    }
}
