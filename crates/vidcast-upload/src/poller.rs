use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vidcast_core::models::{AssetStatus, StatusVerdict};
use vidcast_core::{StreamProvider, UploadConfig, UploadError, UploadResult};

/// Receives every status snapshot, terminal or not.
pub type StatusObserver<'a> = &'a (dyn Fn(&AssetStatus) + Send + Sync);

/// Asset confirmed streamable by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyAsset {
    pub playback_id: String,
    /// The snapshot that carried the playback id
    pub status: AssetStatus,
    pub attempts: u32,
}

/// Polls remote processing state until the asset is ready, failed or the
/// time budget runs out.
///
/// Fetch errors are not retried: the first failed request ends polling.
pub struct StatusPoller {
    provider: Arc<dyn StreamProvider>,
    interval: Duration,
    timeout: Duration,
}

impl StatusPoller {
    pub fn new(provider: Arc<dyn StreamProvider>, interval: Duration, timeout: Duration) -> Self {
        Self {
            provider,
            interval,
            timeout,
        }
    }

    pub fn from_config(provider: Arc<dyn StreamProvider>, config: &UploadConfig) -> Self {
        Self::new(provider, config.poll_interval, config.processing_timeout)
    }

    pub async fn wait_until_ready(
        &self,
        asset_id: &str,
        cancel: &CancellationToken,
        observer: StatusObserver<'_>,
    ) -> UploadResult<ReadyAsset> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            let elapsed = started.elapsed();
            if elapsed > self.timeout {
                tracing::warn!(
                    asset_id = %asset_id,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Processing timed out"
                );
                return Err(UploadError::Timeout {
                    elapsed_secs: elapsed.as_secs(),
                });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }

            attempts += 1;
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                result = self.provider.fetch_asset_status(asset_id) => result?,
            };

            observer(&status);

            match status.verdict() {
                StatusVerdict::Ready(playback_id) => {
                    tracing::info!(
                        asset_id = %asset_id,
                        playback_id = %playback_id,
                        attempts,
                        "Asset ready to stream"
                    );
                    return Ok(ReadyAsset {
                        playback_id,
                        status,
                        attempts,
                    });
                }
                StatusVerdict::Failed { state, reason } => {
                    tracing::warn!(
                        asset_id = %asset_id,
                        state = ?state,
                        reason = %reason,
                        attempts,
                        "Provider reported a processing failure"
                    );
                    return Err(UploadError::Processing { state, reason });
                }
                StatusVerdict::Pending => {
                    tracing::debug!(
                        asset_id = %asset_id,
                        state = ?status.state,
                        percent = ?status.percent(),
                        attempts,
                        "Asset still processing"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use vidcast_core::models::{CreateUploadRequest, UploadTarget};

    /// Serves scripted snapshots; repeats the last one when exhausted.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<UploadResult<AssetStatus>>>,
        last: Mutex<Option<AssetStatus>>,
        calls: Mutex<u32>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<UploadResult<AssetStatus>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                last: Mutex::new(None),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl StreamProvider for ScriptedProvider {
        async fn create_upload_target(
            &self,
            _request: &CreateUploadRequest,
        ) -> UploadResult<UploadTarget> {
            unreachable!("poller never creates targets")
        }

        async fn fetch_asset_status(&self, _asset_id: &str) -> UploadResult<AssetStatus> {
            *self.calls.lock().unwrap() += 1;
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(status)) => {
                    *self.last.lock().unwrap() = Some(status.clone());
                    Ok(status)
                }
                Some(Err(err)) => Err(err),
                None => Ok(self.last.lock().unwrap().clone().unwrap_or_default()),
            }
        }

        async fn delete_asset(&self, _asset_id: &str) -> UploadResult<()> {
            unreachable!("poller never deletes")
        }
    }

    fn pending(state: &str) -> AssetStatus {
        AssetStatus {
            state: Some(state.to_string()),
            ..Default::default()
        }
    }

    fn poller(provider: Arc<ScriptedProvider>) -> StatusPoller {
        StatusPoller::new(provider, Duration::from_secs(4), Duration::from_secs(300))
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_playback_id_appears() {
        let provider = ScriptedProvider::new(vec![
            Ok(pending("inprogress")),
            Ok(AssetStatus {
                state: Some("ready".to_string()),
                playback_id: Some("pb123".to_string()),
                ..Default::default()
            }),
        ]);
        let seen = Mutex::new(Vec::new());
        let observer = |s: &AssetStatus| seen.lock().unwrap().push(s.state.clone());

        let ready = poller(provider.clone())
            .wait_until_ready("abc", &CancellationToken::new(), &observer)
            .await
            .unwrap();

        assert_eq!(ready.playback_id, "pb123");
        assert_eq!(ready.attempts, 2);
        assert_eq!(provider.calls(), 2);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn playback_id_without_ready_flag_is_enough() {
        let provider = ScriptedProvider::new(vec![Ok(AssetStatus {
            state: Some("inprogress".to_string()),
            ready_to_stream: false,
            playback_id: Some("pb".to_string()),
            ..Default::default()
        })]);
        let ready = poller(provider)
            .wait_until_ready("abc", &CancellationToken::new(), &|_| {})
            .await
            .unwrap();
        assert_eq!(ready.playback_id, "pb");
    }

    #[tokio::test(start_paused = true)]
    async fn error_reason_stops_polling_on_that_attempt() {
        let provider = ScriptedProvider::new(vec![
            Ok(pending("queued")),
            Ok(pending("inprogress")),
            Ok(AssetStatus {
                state: Some("inprogress".to_string()),
                error_reason: Some("ERR_NON_VIDEO".to_string()),
                ..Default::default()
            }),
            Ok(pending("inprogress")),
        ]);

        let err = poller(provider.clone())
            .wait_until_ready("abc", &CancellationToken::new(), &|_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Processing { ref reason, .. } if reason == "ERR_NON_VIDEO"));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn error_state_without_reason_fails() {
        let provider = ScriptedProvider::new(vec![Ok(pending("error"))]);
        let err = poller(provider)
            .wait_until_ready("abc", &CancellationToken::new(), &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Processing { ref reason, .. } if reason == "error"));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_forever_times_out() {
        let provider = ScriptedProvider::new(vec![Ok(pending("queued"))]);
        let err = poller(provider.clone())
            .wait_until_ready("abc", &CancellationToken::new(), &|_| {})
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        match err {
            UploadError::Timeout { elapsed_secs } => assert!(elapsed_secs > 300),
            other => panic!("unexpected error: {other:?}"),
        }
        // 4 s interval over a 300 s budget
        assert_eq!(provider.calls(), 76);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_is_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Ok(pending("queued")),
            Err(UploadError::StatusRequest {
                status: Some(502),
                detail: "bad gateway".to_string(),
            }),
            Ok(pending("queued")),
        ]);
        let err = poller(provider.clone())
            .wait_until_ready("abc", &CancellationToken::new(), &|_| {})
            .await
            .unwrap_err();

        assert_eq!(err.remote_status(), Some(502));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let provider = ScriptedProvider::new(vec![Ok(pending("queued"))]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let observer = move |_: &AssetStatus| trigger.cancel();

        let err = poller(provider.clone())
            .wait_until_ready("abc", &cancel, &observer)
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(provider.calls(), 1);
    }
}
