//! Configuration module
//!
//! Provider credentials and upload workflow tuning, read from the environment
//! (a `.env` file is honoured via dotenvy).

use std::env;
use std::time::Duration;

use crate::error::UploadError;

// Common constants
const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const MAX_DURATION_SECONDS: u64 = 60 * 60 * 3;
const CHUNK_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const RETRY_DELAYS_MS: [u64; 4] = [0, 2000, 5000, 10000];
const POLL_INTERVAL_MS: u64 = 4000;
const PROCESSING_TIMEOUT_SECS: u64 = 5 * 60;
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Cloudflare Stream account configuration
#[derive(Clone)]
pub struct StreamConfig {
    pub account_id: String,
    pub api_token: String,
    pub api_base_url: String,
    /// Longest video the direct upload slot will accept
    pub max_duration_seconds: u64,
}

impl std::fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConfig")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("max_duration_seconds", &self.max_duration_seconds)
            .finish()
    }
}

impl StreamConfig {
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_duration_seconds: MAX_DURATION_SECONDS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Read CF_ACCOUNT_ID, CF_STREAM_TOKEN, CF_API_BASE_URL and CF_MAX_DURATION_SECONDS.
    pub fn from_env() -> Result<Self, UploadError> {
        dotenvy::dotenv().ok();

        let account_id = env::var("CF_ACCOUNT_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| UploadError::Configuration("CF_ACCOUNT_ID must be set".to_string()))?;
        let api_token = env::var("CF_STREAM_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                UploadError::Configuration("CF_STREAM_TOKEN must be set".to_string())
            })?;

        let config = StreamConfig {
            account_id,
            api_token,
            api_base_url: env::var("CF_API_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            max_duration_seconds: env::var("CF_MAX_DURATION_SECONDS")
                .unwrap_or_else(|_| MAX_DURATION_SECONDS.to_string())
                .parse()
                .unwrap_or(MAX_DURATION_SECONDS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.account_id.trim().is_empty() || self.api_token.trim().is_empty() {
            return Err(UploadError::Configuration(
                "Missing Cloudflare credentials".to_string(),
            ));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(UploadError::Configuration(
                "CF_API_BASE_URL must be an http(s) URL".to_string(),
            ));
        }
        Ok(())
    }

    /// `{base}/accounts/{account_id}/stream`
    pub fn stream_endpoint(&self) -> String {
        format!(
            "{}/accounts/{}/stream",
            self.api_base_url.trim_end_matches('/'),
            self.account_id
        )
    }
}

/// Upload workflow tuning (transport chunking, retries, polling)
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub chunk_size_bytes: u64,
    /// Waits before each retry of a transient transport failure; its length
    /// is the retry budget.
    pub retry_delays: Vec<Duration>,
    pub poll_interval: Duration,
    pub processing_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: CHUNK_SIZE_BYTES,
            retry_delays: RETRY_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            processing_timeout: Duration::from_secs(PROCESSING_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }
}

impl UploadConfig {
    pub fn from_env() -> Result<Self, UploadError> {
        dotenvy::dotenv().ok();
        let defaults = UploadConfig::default();

        let retry_delays = match env::var("UPLOAD_RETRY_DELAYS_MS") {
            Ok(raw) => parse_retry_delays(&raw)?,
            Err(_) => defaults.retry_delays,
        };

        let config = UploadConfig {
            chunk_size_bytes: env::var("UPLOAD_CHUNK_SIZE_BYTES")
                .unwrap_or_else(|_| CHUNK_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(CHUNK_SIZE_BYTES),
            retry_delays,
            poll_interval: Duration::from_millis(
                env::var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| POLL_INTERVAL_MS.to_string())
                    .parse()
                    .unwrap_or(POLL_INTERVAL_MS),
            ),
            processing_timeout: Duration::from_secs(
                env::var("PROCESSING_TIMEOUT_SECS")
                    .unwrap_or_else(|_| PROCESSING_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(PROCESSING_TIMEOUT_SECS),
            ),
            http_timeout: Duration::from_secs(
                env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(HTTP_TIMEOUT_SECS),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size_bytes == 0 {
            return Err(UploadError::Configuration(
                "UPLOAD_CHUNK_SIZE_BYTES must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(UploadError::Configuration(
                "POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if self.processing_timeout.is_zero() {
            return Err(UploadError::Configuration(
                "PROCESSING_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a comma-separated list of millisecond delays, e.g. "0,2000,5000".
pub fn parse_retry_delays(raw: &str) -> Result<Vec<Duration>, UploadError> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                UploadError::Configuration(format!(
                    "UPLOAD_RETRY_DELAYS_MS contains an invalid delay: {}",
                    s
                ))
            })
        })
        .collect()
}
