//! Cloudflare Stream operations.
//!
//! Response envelopes mirror the provider's `{ success, errors, messages, result }`
//! shape; only the fields the upload workflow reads are modelled.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use vidcast_core::models::{AssetStatus, CreateUploadRequest, UploadTarget};
use vidcast_core::{StreamProvider, UploadError, UploadResult};

use crate::{network_detail, provider_detail, read_body, StreamClient};

/// Standard API envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    pub result: Option<T>,
}

/// `result` of `POST /stream/direct_upload`
#[derive(Debug, Deserialize)]
pub struct DirectUploadResult {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    pub uid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetState {
    pub state: Option<String>,
    /// Sent as a string ("37.5") by the API, occasionally as a number.
    pub pct_complete: Option<Value>,
    pub error_reason_code: Option<String>,
    pub error_reason_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackEntry {
    pub id: Option<String>,
}

/// `result` of `GET /stream/{uid}`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResult {
    pub uid: Option<String>,
    #[serde(default)]
    pub ready_to_stream: Option<bool>,
    pub status: Option<AssetState>,
    pub playback: Option<Vec<PlaybackEntry>>,
    pub playback_ids: Option<Vec<PlaybackEntry>>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
}

fn first_id(entries: &Option<Vec<PlaybackEntry>>) -> Option<String> {
    entries
        .as_ref()
        .and_then(|list| list.first())
        .and_then(|entry| entry.id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn parse_percent(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl From<AssetResult> for AssetStatus {
    fn from(result: AssetResult) -> Self {
        let playback_id = first_id(&result.playback).or_else(|| first_id(&result.playback_ids));
        let state = result.status.unwrap_or_default();
        let error_reason = state
            .error_reason_text
            .filter(|s| !s.trim().is_empty())
            .or(state.error_reason_code.filter(|s| !s.trim().is_empty()));

        AssetStatus {
            state: state.state,
            ready_to_stream: result.ready_to_stream.unwrap_or(false),
            playback_id,
            percent_complete: state.pct_complete.as_ref().and_then(parse_percent),
            error_reason,
            asset_id: result.uid,
            // The API reports -1 until the duration is known.
            duration_seconds: result.duration.filter(|d| *d >= 0.0),
            thumbnail_url: result.thumbnail.filter(|t| !t.is_empty()),
        }
    }
}

impl StreamClient {
    /// `POST /stream/direct_upload`
    pub async fn create_direct_upload(
        &self,
        request: &CreateUploadRequest,
    ) -> UploadResult<UploadTarget> {
        let body = json!({
            "maxDurationSeconds": self.config().max_duration_seconds,
            "meta": { "name": request.filename },
        });

        let response = self
            .apply_auth(self.client().post(self.build_url("/direct_upload")))
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::CreateTarget {
                status: None,
                detail: network_detail(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = read_body(response).await;
            return Err(UploadError::CreateTarget {
                status: Some(status.as_u16()),
                detail: provider_detail(&error_text),
            });
        }

        let envelope: ApiEnvelope<DirectUploadResult> =
            response.json().await.map_err(|e| UploadError::CreateTarget {
                status: Some(status.as_u16()),
                detail: format!("Failed to parse response as JSON: {}", e),
            })?;

        let result = envelope.result.ok_or_else(|| UploadError::CreateTarget {
            status: Some(status.as_u16()),
            detail: "Response did not contain an upload URL".to_string(),
        })?;

        tracing::info!(
            filename = %request.filename,
            filesize = request.filesize,
            uid = ?result.uid,
            "Direct upload created"
        );

        Ok(UploadTarget::new(result.upload_url, result.uid))
    }

    /// `GET /stream/{uid}`
    pub async fn get_asset(&self, asset_id: &str) -> UploadResult<AssetStatus> {
        let path = format!("/{}", urlencoding::encode(asset_id.trim()));
        let response = self
            .apply_auth(self.client().get(self.build_url(&path)))
            .send()
            .await
            .map_err(|e| UploadError::StatusRequest {
                status: None,
                detail: network_detail(&e),
            })?;

        let status = response.status();
        let raw = read_body(response).await;

        if !status.is_success() {
            return Err(UploadError::StatusRequest {
                status: Some(status.as_u16()),
                detail: provider_detail(&raw),
            });
        }

        tracing::debug!(asset_id = %asset_id, payload = %raw, "Stream status");

        let envelope: ApiEnvelope<AssetResult> =
            serde_json::from_str(&raw).map_err(|e| UploadError::StatusRequest {
                status: Some(status.as_u16()),
                detail: format!("Unparseable status response: {}", e),
            })?;

        if envelope.success == Some(false) {
            return Err(UploadError::StatusRequest {
                status: Some(status.as_u16()),
                detail: provider_detail(&raw),
            });
        }

        let result = envelope.result.ok_or_else(|| UploadError::StatusRequest {
            status: Some(status.as_u16()),
            detail: "Status response had no result".to_string(),
        })?;

        Ok(result.into())
    }

    /// `DELETE /stream/{uid}`. A 404 means the asset is already gone.
    pub async fn delete_stream_asset(&self, asset_id: &str) -> UploadResult<()> {
        let asset_id = asset_id.trim();
        if asset_id.is_empty() {
            return Err(UploadError::MissingStoredAsset);
        }

        let path = format!("/{}", urlencoding::encode(asset_id));
        let response = self
            .apply_auth(self.client().delete(self.build_url(&path)))
            .send()
            .await
            .map_err(|e| UploadError::Delete {
                status: None,
                detail: network_detail(&e),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::info!(asset_id = %asset_id, "Stream asset already deleted");
            return Ok(());
        }
        if !status.is_success() {
            let error_text = read_body(response).await;
            return Err(UploadError::Delete {
                status: Some(status.as_u16()),
                detail: provider_detail(&error_text),
            });
        }

        tracing::info!(asset_id = %asset_id, "Stream asset deleted");
        Ok(())
    }
}

#[async_trait]
impl StreamProvider for StreamClient {
    async fn create_upload_target(
        &self,
        request: &CreateUploadRequest,
    ) -> UploadResult<UploadTarget> {
        self.create_direct_upload(request).await
    }

    async fn fetch_asset_status(&self, asset_id: &str) -> UploadResult<AssetStatus> {
        self.get_asset(asset_id).await
    }

    async fn delete_asset(&self, asset_id: &str) -> UploadResult<()> {
        self.delete_stream_asset(asset_id).await
    }
}
