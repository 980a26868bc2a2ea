//! HTTP client for Cloudflare Stream.
//!
//! [`StreamClient`] implements the three provider operations the upload
//! workflow needs (create a direct upload, fetch asset status, delete an
//! asset). [`TusTransport`] pushes file bytes to a direct upload URL in
//! resumable chunks.

pub mod api;
pub mod tus;

use anyhow::Context;
use reqwest::Client;
use std::time::Duration;
use vidcast_core::{StreamConfig, UploadConfig, UploadResult};

pub use tus::TusTransport;

/// Fallback detail when the provider sent an empty error body.
const EMPTY_DETAIL: &str = "Invalid response";

/// HTTP client for the Cloudflare Stream API, authenticated with a bearer token.
#[derive(Clone, Debug)]
pub struct StreamClient {
    client: Client,
    config: StreamConfig,
}

impl StreamClient {
    pub fn new(config: StreamConfig, http_timeout: Duration) -> UploadResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(http_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Create client from environment: CF_ACCOUNT_ID, CF_STREAM_TOKEN and HTTP_TIMEOUT_SECS.
    pub fn from_env() -> UploadResult<Self> {
        let config = StreamConfig::from_env()?;
        let upload_config = UploadConfig::from_env()?;
        Self::new(config, upload_config.http_timeout)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// `{stream endpoint}{path}`
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.stream_endpoint(), path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.config.api_token)
    }

    /// Raw client for custom requests. Caller must apply auth.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Human-readable detail from a provider error body.
///
/// JSON bodies with a non-empty `errors` (or `messages`) array are reduced to
/// that array; anything else is returned verbatim.
pub fn provider_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return EMPTY_DETAIL.to_string();
    }

    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["errors", "messages"] {
            if let Some(items) = parsed.get(key).and_then(|v| v.as_array()) {
                if !items.is_empty() {
                    return serde_json::Value::Array(items.clone()).to_string();
                }
            }
        }
    }

    trimmed.to_string()
}

/// Read a response body as text, never failing.
pub(crate) async fn read_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}

pub(crate) fn network_detail(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    }
}
