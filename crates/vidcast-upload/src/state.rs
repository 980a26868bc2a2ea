//! Upload workflow state machine.
//!
//! [`UploadStatus::apply`] is a pure reducer: it maps the current status and
//! one [`UploadEvent`] to the next status, or rejects the event when the
//! stage does not accept it. The orchestrator owns the only mutable copy.
//!
//! ```text
//! idle ─▶ preparing ─▶ uploading ─▶ processing ─▶ complete
//!           │             │             │
//!           └─────────────┴─────────────┴──▶ error ─▶ preparing
//! idle | complete | error ─▶ deleting ─▶ idle | error
//! ```
//!
//! `interrupted` returns any unsettled stage to idle when the session driving
//! it was dropped before it could settle.

use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use vidcast_core::models::AssetStatus;
use vidcast_core::{ErrorMetadata, UploadError, UploadResult};

use crate::progress::{COMPLETE_PERCENT, PREPARING_PERCENT, PROCESSING_RANGE, UPLOAD_RANGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Idle,
    Preparing,
    Uploading,
    Processing,
    Complete,
    Error,
    Deleting,
}

impl UploadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStage::Idle => "idle",
            UploadStage::Preparing => "preparing",
            UploadStage::Uploading => "uploading",
            UploadStage::Processing => "processing",
            UploadStage::Complete => "complete",
            UploadStage::Error => "error",
            UploadStage::Deleting => "deleting",
        }
    }

    /// Stages with an upload session in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            UploadStage::Preparing | UploadStage::Uploading | UploadStage::Processing
        )
    }

    /// Stages from which a new file or a delete may start.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            UploadStage::Idle | UploadStage::Complete | UploadStage::Error
        )
    }
}

impl Display for UploadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Failure shown alongside an `error` stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusError {
    pub code: &'static str,
    /// Short headline, e.g. "The upload failed"
    pub title: String,
    /// Full message including any provider detail
    pub message: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    /// Set when processing ran out of time rather than failing remotely.
    pub timed_out: bool,
}

impl From<&UploadError> for StatusError {
    fn from(err: &UploadError) -> Self {
        Self {
            code: err.error_code(),
            title: err.client_message(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            action: err.suggested_action(),
            timed_out: err.is_timeout(),
        }
    }
}

/// Everything an observer needs to render the workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadStatus {
    pub stage: UploadStage,
    /// Display percent, 0-100
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StatusError>,
}

impl Default for UploadStatus {
    fn default() -> Self {
        Self {
            stage: UploadStage::Idle,
            progress: 0,
            message: "Select a video to upload".to_string(),
            detail: None,
            error: None,
        }
    }
}

/// Inputs of the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    FileSelected { name: String },
    TargetObtained,
    /// Transport percent, `None` when it could not be computed
    TransferProgress(Option<f64>),
    TransferFinished,
    ProcessingProgress(AssetStatus),
    Completed { playback_id: String },
    Failed(StatusError),
    Cancelled,
    /// The session future was dropped mid-flight
    Interrupted,
    DeleteRequested,
    Deleted,
    DeleteFailed(StatusError),
}

impl UploadEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UploadEvent::FileSelected { .. } => "file_selected",
            UploadEvent::TargetObtained => "target_obtained",
            UploadEvent::TransferProgress(_) => "transfer_progress",
            UploadEvent::TransferFinished => "transfer_finished",
            UploadEvent::ProcessingProgress(_) => "processing_progress",
            UploadEvent::Completed { .. } => "completed",
            UploadEvent::Failed(_) => "failed",
            UploadEvent::Cancelled => "cancelled",
            UploadEvent::Interrupted => "interrupted",
            UploadEvent::DeleteRequested => "delete_requested",
            UploadEvent::Deleted => "deleted",
            UploadEvent::DeleteFailed(_) => "delete_failed",
        }
    }

    pub fn failed(err: &UploadError) -> Self {
        UploadEvent::Failed(StatusError::from(err))
    }
}

impl UploadStatus {
    fn at(stage: UploadStage, progress: u8, message: &str, detail: Option<String>) -> Self {
        Self {
            stage,
            progress,
            message: message.to_string(),
            detail,
            error: None,
        }
    }

    fn failure(error: StatusError) -> Self {
        Self {
            stage: UploadStage::Error,
            progress: 0,
            message: error.title.clone(),
            detail: Some(error.message.clone()),
            error: Some(error),
        }
    }

    /// Apply one event, returning the next status.
    pub fn apply(&self, event: UploadEvent) -> UploadResult<UploadStatus> {
        use UploadEvent as E;
        use UploadStage as S;

        let next = match (self.stage, event) {
            (stage, E::FileSelected { name }) if stage.is_settled() => Self::at(
                S::Preparing,
                PREPARING_PERCENT,
                "Requesting an upload URL",
                Some(name),
            ),
            (S::Preparing, E::TargetObtained) => Self::at(
                S::Uploading,
                UPLOAD_RANGE.start,
                "Uploading to Cloudflare Stream",
                Some("0 %".to_string()),
            ),
            (S::Uploading, E::TransferProgress(percent)) => {
                let detail = percent
                    .filter(|p| p.is_finite())
                    .map(|p| format!("{} %", p.clamp(0.0, 100.0).round()))
                    .or_else(|| self.detail.clone());
                Self::at(
                    S::Uploading,
                    UPLOAD_RANGE.advance(self.progress, percent),
                    &self.message,
                    detail,
                )
            }
            (S::Uploading, E::TransferFinished) => Self::at(
                S::Processing,
                PROCESSING_RANGE.start,
                "Processing on Cloudflare Stream",
                None,
            ),
            (S::Processing, E::ProcessingProgress(status)) => {
                let summary = status.to_string();
                let detail = if summary.is_empty() {
                    self.detail.clone()
                } else {
                    Some(summary)
                };
                Self::at(
                    S::Processing,
                    PROCESSING_RANGE.advance(self.progress, status.percent()),
                    &self.message,
                    detail,
                )
            }
            (S::Processing, E::Completed { playback_id }) => Self::at(
                S::Complete,
                COMPLETE_PERCENT,
                "Video ready",
                Some(playback_id),
            ),
            (stage, E::Failed(error)) if stage.is_active() => Self::failure(error),
            (stage, E::Cancelled) if stage.is_active() => {
                Self::at(S::Idle, 0, "Upload cancelled", None)
            }
            (stage, E::Interrupted) if !stage.is_settled() => {
                Self::at(S::Idle, 0, "Upload interrupted", None)
            }
            (stage, E::DeleteRequested) if stage.is_settled() => {
                Self::at(S::Deleting, 0, "Deleting the video", None)
            }
            (S::Deleting, E::Deleted) => Self::at(S::Idle, 0, "Video deleted", None),
            (S::Deleting, E::DeleteFailed(error)) => Self::failure(error),
            (stage, event) => {
                return Err(UploadError::InvalidTransition {
                    from: stage.to_string(),
                    event: event.name(),
                })
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: Vec<UploadEvent>) -> UploadStatus {
        events
            .into_iter()
            .fold(UploadStatus::default(), |status, event| {
                status.apply(event).unwrap()
            })
    }

    fn selected() -> UploadEvent {
        UploadEvent::FileSelected {
            name: "clip.mp4".to_string(),
        }
    }

    #[test]
    fn happy_path_reaches_complete() {
        let status = run(vec![
            selected(),
            UploadEvent::TargetObtained,
            UploadEvent::TransferProgress(Some(100.0)),
            UploadEvent::TransferFinished,
            UploadEvent::ProcessingProgress(AssetStatus {
                state: Some("inprogress".to_string()),
                percent_complete: Some(50.0),
                ..Default::default()
            }),
            UploadEvent::Completed {
                playback_id: "pb123".to_string(),
            },
        ]);
        assert_eq!(status.stage, UploadStage::Complete);
        assert_eq!(status.progress, 100);
        assert_eq!(status.detail.as_deref(), Some("pb123"));
    }

    #[test]
    fn stage_percentages() {
        let preparing = UploadStatus::default().apply(selected()).unwrap();
        assert_eq!(preparing.progress, 5);
        let uploading = preparing.apply(UploadEvent::TargetObtained).unwrap();
        assert_eq!(uploading.progress, 10);
        let halfway = uploading
            .apply(UploadEvent::TransferProgress(Some(42.0)))
            .unwrap();
        assert_eq!(halfway.progress, 44);
        assert_eq!(halfway.detail.as_deref(), Some("42 %"));
        let processing = halfway.apply(UploadEvent::TransferFinished).unwrap();
        assert_eq!(processing.progress, 90);
    }

    #[test]
    fn processing_detail_summarises_remote_status() {
        let status = run(vec![
            selected(),
            UploadEvent::TargetObtained,
            UploadEvent::TransferFinished,
            UploadEvent::ProcessingProgress(AssetStatus {
                state: Some("inprogress".to_string()),
                percent_complete: Some(37.0),
                error_reason: Some("audio track missing".to_string()),
                ..Default::default()
            }),
        ]);
        assert_eq!(
            status.detail.as_deref(),
            Some("Stage: inprogress | 37 % | Cloudflare warning: audio track missing")
        );
        assert_eq!(status.progress, 93);
    }

    #[test]
    fn failure_carries_error_and_resets_progress() {
        let err = UploadError::Timeout { elapsed_secs: 304 };
        let status = run(vec![
            selected(),
            UploadEvent::TargetObtained,
            UploadEvent::TransferFinished,
            UploadEvent::failed(&err),
        ]);
        assert_eq!(status.stage, UploadStage::Error);
        assert_eq!(status.progress, 0);
        let error = status.error.unwrap();
        assert!(error.timed_out);
        assert_eq!(error.code, "PROCESSING_TIMEOUT");
        assert_eq!(error.action, Some("Retry the upload"));
        assert!(error.message.contains("304 s"));
    }

    #[test]
    fn error_accepts_a_new_file() {
        let failed = run(vec![
            selected(),
            UploadEvent::failed(&UploadError::CreateTarget {
                status: Some(500),
                detail: "boom".to_string(),
            }),
        ]);
        let retry = failed.apply(selected()).unwrap();
        assert_eq!(retry.stage, UploadStage::Preparing);
        assert!(retry.error.is_none());
    }

    #[test]
    fn cancel_returns_to_idle() {
        let status = run(vec![
            selected(),
            UploadEvent::TargetObtained,
            UploadEvent::TransferProgress(Some(30.0)),
            UploadEvent::Cancelled,
        ]);
        assert_eq!(status.stage, UploadStage::Idle);
        assert_eq!(status.progress, 0);
    }

    #[test]
    fn interrupted_resets_unsettled_stages_only() {
        let processing = run(vec![
            selected(),
            UploadEvent::TargetObtained,
            UploadEvent::TransferFinished,
        ]);
        let reset = processing.apply(UploadEvent::Interrupted).unwrap();
        assert_eq!(reset.stage, UploadStage::Idle);
        assert_eq!(reset.progress, 0);
        assert_eq!(reset.apply(selected()).unwrap().stage, UploadStage::Preparing);

        let deleting = run(vec![UploadEvent::DeleteRequested]);
        assert_eq!(
            deleting.apply(UploadEvent::Interrupted).unwrap().stage,
            UploadStage::Idle
        );

        let complete = run(vec![
            selected(),
            UploadEvent::TargetObtained,
            UploadEvent::TransferFinished,
            UploadEvent::Completed {
                playback_id: "pb123".to_string(),
            },
        ]);
        assert!(complete.apply(UploadEvent::Interrupted).is_err());
    }

    #[test]
    fn delete_flow() {
        let deleted = run(vec![UploadEvent::DeleteRequested, UploadEvent::Deleted]);
        assert_eq!(deleted.stage, UploadStage::Idle);

        let failed = run(vec![
            UploadEvent::DeleteRequested,
            UploadEvent::DeleteFailed(StatusError::from(&UploadError::MissingStoredAsset)),
        ]);
        assert_eq!(failed.stage, UploadStage::Error);
        assert_eq!(failed.error.unwrap().code, "MISSING_STORED_ASSET");
    }

    #[test]
    fn rejects_out_of_order_events() {
        let idle = UploadStatus::default();
        assert!(matches!(
            idle.apply(UploadEvent::TransferFinished),
            Err(UploadError::InvalidTransition { .. })
        ));
        assert!(idle.apply(UploadEvent::Cancelled).is_err());

        let uploading = run(vec![selected(), UploadEvent::TargetObtained]);
        assert!(uploading.apply(selected()).is_err());
        assert!(uploading.apply(UploadEvent::DeleteRequested).is_err());
        match uploading.apply(UploadEvent::Deleted) {
            Err(UploadError::InvalidTransition { from, event }) => {
                assert_eq!(from, "uploading");
                assert_eq!(event, "deleted");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn progress_is_monotonic_within_session() {
        let mut status = run(vec![selected(), UploadEvent::TargetObtained]);
        let mut shown = status.progress;
        for event in [
            UploadEvent::TransferProgress(Some(20.0)),
            UploadEvent::TransferProgress(None),
            UploadEvent::TransferProgress(Some(f64::NAN)),
            UploadEvent::TransferProgress(Some(10.0)),
            UploadEvent::TransferProgress(Some(100.0)),
            UploadEvent::TransferFinished,
            UploadEvent::ProcessingProgress(AssetStatus::default()),
            UploadEvent::ProcessingProgress(AssetStatus {
                percent_complete: Some(1.0),
                ..Default::default()
            }),
        ] {
            status = status.apply(event).unwrap();
            assert!(status.progress >= shown);
            shown = status.progress;
        }
    }

    #[test]
    fn status_serialises_for_observers() {
        let json = serde_json::to_value(UploadStatus::default()).unwrap();
        assert_eq!(json["stage"], "idle");
        assert!(json.get("error").is_none());
    }
}
