use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Remote processing state labels that end processing with a failure.
const TERMINAL_ERROR_STATES: [&str; 2] = ["error", "failed"];

/// Snapshot of the provider's processing state for one asset
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetStatus {
    /// Free-form state label ("queued", "inprogress", "ready", "error", ...)
    pub state: Option<String>,
    pub ready_to_stream: bool,
    pub playback_id: Option<String>,
    pub percent_complete: Option<f64>,
    pub error_reason: Option<String>,
    /// Asset identifier echoed by the provider
    pub asset_id: Option<String>,
    pub duration_seconds: Option<f64>,
    pub thumbnail_url: Option<String>,
}

/// How a single status snapshot ends (or does not end) polling
#[derive(Debug, Clone, PartialEq)]
pub enum StatusVerdict {
    /// A playback identifier is available
    Ready(String),
    /// The provider reported a failure
    Failed {
        state: Option<String>,
        reason: String,
    },
    /// Keep polling
    Pending,
}

impl AssetStatus {
    /// Trimmed, non-empty playback identifier.
    pub fn playback_id(&self) -> Option<&str> {
        self.playback_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    /// Percent complete clamped to 0-100; NaN and infinities count as unknown.
    pub fn percent(&self) -> Option<f64> {
        self.percent_complete
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 100.0))
    }

    pub fn is_error_state(&self) -> bool {
        self.state
            .as_deref()
            .map(|s| {
                let s = s.trim().to_ascii_lowercase();
                TERMINAL_ERROR_STATES.contains(&s.as_str())
            })
            .unwrap_or(false)
    }

    /// Classify this snapshot. A playback identifier wins over everything
    /// else; an error label or an error reason is terminal.
    pub fn verdict(&self) -> StatusVerdict {
        if let Some(playback_id) = self.playback_id() {
            return StatusVerdict::Ready(playback_id.to_string());
        }

        if self.is_error_state() || self.error_reason().is_some() {
            let reason = self
                .error_reason()
                .map(str::to_string)
                .or_else(|| self.state.clone())
                .unwrap_or_else(|| "Unknown error".to_string());
            return StatusVerdict::Failed {
                state: self.state.clone(),
                reason,
            };
        }

        StatusVerdict::Pending
    }
}

impl Display for AssetStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut parts: Vec<String> = Vec::new();
        if let Some(state) = self.state.as_deref() {
            parts.push(format!("Stage: {}", state));
        }
        if let Some(percent) = self.percent() {
            parts.push(format!("{} %", percent.round()));
        }
        if let Some(reason) = self.error_reason() {
            parts.push(format!("Cloudflare warning: {}", reason));
        }
        write!(f, "{}", parts.join(" | "))
    }
}
