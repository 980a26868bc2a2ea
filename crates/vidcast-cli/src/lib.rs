use serde_json::{json, Value};
use std::path::PathBuf;
use vidcast_core::format::format_duration;
use vidcast_core::models::StreamValue;
use vidcast_upload::UploadStatus;

/// Default directory of the local record store.
pub const DEFAULT_RECORD_DIR: &str = "./.vidcast/records";

/// Record directory from VIDCAST_RECORD_DIR, or [`DEFAULT_RECORD_DIR`].
pub fn record_dir() -> PathBuf {
    std::env::var("VIDCAST_RECORD_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORD_DIR))
}

/// One status line, e.g. `[ 44%] uploading: Uploading to Cloudflare Stream (42 %)`.
pub fn render_status(status: &UploadStatus) -> String {
    let mut line = format!(
        "[{:>3}%] {}: {}",
        status.progress, status.stage, status.message
    );
    if let Some(detail) = status.detail.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(" ({})", detail));
    }
    if let Some(action) = status.error.as_ref().and_then(|e| e.action) {
        line.push_str(&format!(". {}", action));
    }
    line
}

/// JSON view of a record with the duration formatted as `mm:ss`.
pub fn record_summary(document_id: &str, value: &StreamValue) -> Value {
    json!({
        "document": document_id,
        "playbackId": value.playback_id(),
        "streamUid": value.stored_asset_id(),
        "duration": format_duration(value.duration),
        "thumbnailUrl": value.thumbnail_url,
        "uploadedAt": value.uploaded_at,
    })
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
