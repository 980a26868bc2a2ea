use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stream fields of a persisted video document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_id: Option<String>,
    #[serde(default, rename = "streamUid", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Optional fields written alongside the identifiers on commit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Enrichment {
    pub duration_seconds: Option<f64>,
    pub thumbnail_url: Option<String>,
}

/// A single atomic change to a record's stream fields
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPatch {
    /// Replace every stream field
    Set(StreamValue),
    /// Unset every stream field
    Clear,
}

impl StreamValue {
    pub fn committed(
        playback_id: impl Into<String>,
        asset_id: Option<String>,
        enrichment: Enrichment,
    ) -> Self {
        Self {
            playback_id: Some(playback_id.into()),
            asset_id,
            duration: enrichment.duration_seconds,
            thumbnail_url: enrichment.thumbnail_url,
            uploaded_at: Some(Utc::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.playback_id.is_none()
            && self.asset_id.is_none()
            && self.duration.is_none()
            && self.thumbnail_url.is_none()
    }

    /// Whether the record references a remote asset at all.
    pub fn has_identifiers(&self) -> bool {
        self.playback_id().is_some() || self.stored_asset_id().is_some()
    }

    pub fn playback_id(&self) -> Option<&str> {
        self.playback_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Trimmed asset identifier usable for delete calls.
    pub fn stored_asset_id(&self) -> Option<&str> {
        self.asset_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

impl RecordPatch {
    /// The value the record holds after this patch.
    pub fn apply(&self) -> StreamValue {
        match self {
            RecordPatch::Set(value) => value.clone(),
            RecordPatch::Clear => StreamValue::default(),
        }
    }

    /// Patch that puts a record back to `value`.
    pub fn restore(value: &StreamValue) -> Self {
        if value.is_empty() {
            RecordPatch::Clear
        } else {
            RecordPatch::Set(value.clone())
        }
    }
}
