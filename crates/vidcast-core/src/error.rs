//! Error types module
//!
//! All failures of the upload workflow are unified under [`UploadError`]. The
//! variants follow the workflow's failure taxonomy: configuration problems,
//! collaborator rejections, transport failures, processing failures, timeouts
//! and user cancellation (which callers treat as a clean rollback, not a
//! failure).

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and provider rejections
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented and logged.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the editor
    fn suggested_action(&self) -> Option<&'static str>;

    /// Human-readable headline shown next to the failure detail
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Could not create a direct upload URL: {detail}")]
    CreateTarget { status: Option<u16>, detail: String },

    #[error("Cloudflare Stream did not return an asset identifier for this upload")]
    MissingAssetId,

    #[error("Upload to Cloudflare Stream failed ({status}): {detail}")]
    Transport { status: u16, detail: String },

    #[error("Upload to Cloudflare Stream failed (network error): {0}")]
    TransportNetwork(String),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("Could not fetch Cloudflare Stream status: {detail}")]
    StatusRequest { status: Option<u16>, detail: String },

    #[error("Cloudflare Stream could not process the video: {reason}")]
    Processing {
        state: Option<String>,
        reason: String,
    },

    #[error("Cloudflare Stream took too long to finalize the video ({elapsed_secs} s elapsed)")]
    Timeout { elapsed_secs: u64 },

    #[error("No Cloudflare Stream asset identifier is stored for this record")]
    MissingStoredAsset,

    #[error("Unable to delete Cloudflare Stream asset: {detail}")]
    Delete { status: Option<u16>, detail: String },

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: &'static str },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for upload workflow operations
pub type UploadResult<T> = Result<T, UploadError>;

impl UploadError {
    /// True when the processing budget ran out (as opposed to a provider error).
    pub fn is_timeout(&self) -> bool {
        matches!(self, UploadError::Timeout { .. })
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, UploadError::Cancelled)
    }

    /// HTTP status reported by the remote side, when one was received.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            UploadError::Transport { status, .. } => Some(*status),
            UploadError::CreateTarget { status, .. }
            | UploadError::StatusRequest { status, .. }
            | UploadError::Delete { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<anyhow::Error> for UploadError {
    fn from(err: anyhow::Error) -> Self {
        UploadError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for UploadError {
    fn from(err: io::Error) -> Self {
        UploadError::Internal(format!("IO error: {}", err))
    }
}

impl From<validator::ValidationErrors> for UploadError {
    fn from(err: validator::ValidationErrors) -> Self {
        UploadError::InvalidFile(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn upload_error_static_metadata(
    err: &UploadError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        UploadError::Configuration(_) => (
            "CONFIGURATION_ERROR",
            false,
            Some("Set CF_ACCOUNT_ID and CF_STREAM_TOKEN"),
            LogLevel::Error,
        ),
        UploadError::InvalidFile(_) => (
            "INVALID_FILE",
            false,
            Some("Select a non-empty video file"),
            LogLevel::Debug,
        ),
        UploadError::CreateTarget { .. } => (
            "CREATE_UPLOAD_FAILED",
            true,
            Some("Retry the upload"),
            LogLevel::Warn,
        ),
        UploadError::MissingAssetId => (
            "MISSING_ASSET_ID",
            true,
            Some("Retry the upload"),
            LogLevel::Warn,
        ),
        UploadError::Transport { .. } => (
            "TRANSPORT_ERROR",
            false,
            Some("Check the file and the provider detail, then retry"),
            LogLevel::Warn,
        ),
        UploadError::TransportNetwork(_) => (
            "TRANSPORT_NETWORK_ERROR",
            true,
            Some("Check the network connection and retry"),
            LogLevel::Warn,
        ),
        UploadError::Cancelled => ("UPLOAD_CANCELLED", true, None, LogLevel::Debug),
        UploadError::StatusRequest { .. } => (
            "STATUS_REQUEST_FAILED",
            true,
            Some("Retry the upload"),
            LogLevel::Warn,
        ),
        UploadError::Processing { .. } => (
            "PROCESSING_FAILED",
            false,
            Some("Check the video encoding and upload a different file"),
            LogLevel::Warn,
        ),
        UploadError::Timeout { .. } => (
            "PROCESSING_TIMEOUT",
            true,
            Some("Retry the upload"),
            LogLevel::Warn,
        ),
        UploadError::MissingStoredAsset => (
            "MISSING_STORED_ASSET",
            false,
            Some("Reload the record or upload the video again"),
            LogLevel::Debug,
        ),
        UploadError::Delete { .. } => (
            "DELETE_FAILED",
            true,
            Some("Retry the deletion"),
            LogLevel::Warn,
        ),
        UploadError::Store(_) => (
            "STORE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        UploadError::InvalidTransition { .. } => {
            ("INVALID_TRANSITION", false, None, LogLevel::Error)
        }
        UploadError::Internal(_) | UploadError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        upload_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        upload_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::Configuration(_) => "Missing Cloudflare credentials".to_string(),
            UploadError::InvalidFile(msg) => msg.clone(),
            UploadError::CreateTarget { .. } | UploadError::MissingAssetId => {
                "Could not prepare the upload".to_string()
            }
            UploadError::Transport { .. }
            | UploadError::TransportNetwork(_)
            | UploadError::StatusRequest { .. }
            | UploadError::Processing { .. }
            | UploadError::Timeout { .. } => "The upload failed".to_string(),
            UploadError::Cancelled => "Upload cancelled".to_string(),
            UploadError::MissingStoredAsset => {
                "Could not find the Cloudflare asset identifier to delete".to_string()
            }
            UploadError::Delete { .. } => "Could not delete the Cloudflare asset".to_string(),
            UploadError::Store(_) => "Could not save the video record".to_string(),
            UploadError::InvalidTransition { .. }
            | UploadError::Internal(_)
            | UploadError::InternalWithSource { .. } => "Internal error".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_configuration() {
        let err = UploadError::Configuration("CF_ACCOUNT_ID is not set".to_string());
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Missing Cloudflare credentials");
        assert_eq!(
            err.suggested_action(),
            Some("Set CF_ACCOUNT_ID and CF_STREAM_TOKEN")
        );
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_transport_error_keeps_provider_detail() {
        let err = UploadError::Transport {
            status: 413,
            detail: r#"[{"code":10005,"message":"too large"}]"#.to_string(),
        };
        assert_eq!(err.remote_status(), Some(413));
        let rendered = err.to_string();
        assert!(rendered.contains("(413)"));
        assert!(rendered.contains("too large"));
    }

    #[test]
    fn test_timeout_is_distinct_from_processing() {
        let timeout = UploadError::Timeout { elapsed_secs: 301 };
        let processing = UploadError::Processing {
            state: Some("error".to_string()),
            reason: "codec unsupported".to_string(),
        };
        assert!(timeout.is_timeout());
        assert!(!processing.is_timeout());
        assert_ne!(timeout.error_code(), processing.error_code());
        assert!(timeout.to_string().contains("301 s"));
    }

    #[test]
    fn test_missing_stored_asset_differs_from_delete_failure() {
        let missing = UploadError::MissingStoredAsset;
        let failed = UploadError::Delete {
            status: Some(500),
            detail: "boom".to_string(),
        };
        assert_ne!(missing.error_code(), failed.error_code());
        assert_eq!(missing.remote_status(), None);
        assert_eq!(failed.remote_status(), Some(500));
    }

    #[test]
    fn test_cancellation_flag() {
        assert!(UploadError::Cancelled.is_cancellation());
        assert!(!UploadError::TransportNetwork("reset".into()).is_cancellation());
    }

    #[test]
    fn test_from_anyhow_keeps_message() {
        let err: UploadError = anyhow::anyhow!("disk unplugged").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        match err {
            UploadError::InternalWithSource { message, .. } => {
                assert_eq!(message, "disk unplugged")
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
