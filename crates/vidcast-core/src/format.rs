//! Display helpers for stream enrichment fields.

/// Base URL of the public delivery host.
pub const DELIVERY_BASE_URL: &str = "https://videodelivery.net";

/// Format seconds as `mm:ss`. Negative values clamp to zero; NaN yields `None`.
pub fn format_duration(seconds: Option<f64>) -> Option<String> {
    let value = seconds?;
    if value.is_nan() {
        return None;
    }
    let total = value.max(0.0).floor() as u64;
    Some(format!("{:02}:{:02}", total / 60, total % 60))
}

/// Default poster frame for a playback identifier.
pub fn default_thumbnail_url(playback_id: &str) -> String {
    format!(
        "{}/{}/thumbnails/thumbnail.jpg?height=720",
        DELIVERY_BASE_URL,
        urlencoding::encode(playback_id)
    )
}
