//! Resumable chunked transport (tus 1.0.0 core protocol).
//!
//! The direct upload URL already identifies a server-side upload, so the
//! transport starts at offset zero and sends fixed-size `PATCH` chunks. After
//! a transient failure it waits the next retry delay, asks the server for the
//! acknowledged offset with `HEAD`, and resumes from there.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::io::SeekFrom;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use vidcast_core::models::{UploadFile, UploadTarget};
use vidcast_core::{
    ProgressCallback, TransferProgress, Transport, UploadConfig, UploadError, UploadResult,
};

use crate::{network_detail, provider_detail, read_body};

const TUS_VERSION: &str = "1.0.0";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

/// Outcome of one failed protocol request
#[derive(Debug)]
enum RequestFailure {
    /// Worth retrying after a delay
    Transient(UploadError),
    /// The server rejected the upload
    Permanent(UploadError),
}

/// Whether a failed response is worth retrying.
fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::CONFLICT || status == StatusCode::LOCKED
}

async fn classify_response(response: reqwest::Response) -> RequestFailure {
    let status = response.status();
    let body = read_body(response).await;
    let err = UploadError::Transport {
        status: status.as_u16(),
        detail: provider_detail(&body),
    };
    if is_retryable_status(status) {
        RequestFailure::Transient(err)
    } else {
        RequestFailure::Permanent(err)
    }
}

fn parse_offset(response: &reqwest::Response) -> Result<u64, RequestFailure> {
    response
        .headers()
        .get("Upload-Offset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            RequestFailure::Permanent(UploadError::Transport {
                status: response.status().as_u16(),
                detail: "Response is missing a valid Upload-Offset header".to_string(),
            })
        })
}

/// tus client for direct upload URLs
#[derive(Clone, Debug)]
pub struct TusTransport {
    client: Client,
    chunk_size: u64,
    retry_delays: Vec<Duration>,
}

impl TusTransport {
    pub fn new(config: &UploadConfig) -> UploadResult<Self> {
        config.validate()?;
        // No overall timeout: a 10 MiB chunk on a slow link can take minutes.
        let client = Client::builder()
            .connect_timeout(config.http_timeout)
            .build()
            .map_err(|e| UploadError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size_bytes,
            retry_delays: config.retry_delays.clone(),
        })
    }

    /// `HEAD` the upload to learn how many bytes the server holds.
    async fn fetch_offset(&self, upload_url: &str) -> Result<u64, RequestFailure> {
        let response = self
            .client
            .head(upload_url)
            .header("Tus-Resumable", TUS_VERSION)
            .send()
            .await
            .map_err(|e| {
                RequestFailure::Transient(UploadError::TransportNetwork(network_detail(&e)))
            })?;

        if !response.status().is_success() {
            return Err(classify_response(response).await);
        }
        parse_offset(&response)
    }

    /// `PATCH` one chunk at `offset`; returns the server's new offset.
    async fn send_chunk(
        &self,
        upload_url: &str,
        offset: u64,
        chunk: Vec<u8>,
    ) -> Result<u64, RequestFailure> {
        let response = self
            .client
            .patch(upload_url)
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Offset", offset.to_string())
            .header("Content-Type", OFFSET_CONTENT_TYPE)
            .body(chunk)
            .send()
            .await
            .map_err(|e| {
                RequestFailure::Transient(UploadError::TransportNetwork(network_detail(&e)))
            })?;

        if !response.status().is_success() {
            return Err(classify_response(response).await);
        }
        parse_offset(&response)
    }

    /// Best-effort termination of the server-side upload.
    async fn terminate(&self, upload_url: &str) {
        let result = self
            .client
            .delete(upload_url)
            .header("Tus-Resumable", TUS_VERSION)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(upload_url = %upload_url, "tus upload terminated");
            }
            Ok(response) => {
                tracing::warn!(
                    upload_url = %upload_url,
                    status = %response.status(),
                    "tus termination rejected"
                );
            }
            Err(e) => {
                tracing::warn!(upload_url = %upload_url, error = %e, "tus termination failed");
            }
        }
    }

    async fn read_chunk(&self, file: &mut File, offset: u64, total: u64) -> UploadResult<Vec<u8>> {
        let len = self.chunk_size.min(total - offset) as usize;
        let mut buffer = vec![0u8; len];
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(&mut buffer).await.map_err(|e| {
            UploadError::InvalidFile(format!("File changed while uploading: {}", e))
        })?;
        Ok(buffer)
    }

    async fn cancelled(&self, upload_url: &str) -> UploadError {
        self.terminate(upload_url).await;
        UploadError::Cancelled
    }
}

#[async_trait]
impl Transport for TusTransport {
    async fn upload(
        &self,
        target: &UploadTarget,
        file: &UploadFile,
        on_progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> UploadResult<()> {
        let upload_url = target.upload_url.as_str();
        let total = file.size_bytes;

        if cancel.is_cancelled() {
            return Err(self.cancelled(upload_url).await);
        }

        let mut source = File::open(&file.path).await.map_err(|e| {
            UploadError::InvalidFile(format!("Failed to open {}: {}", file.path.display(), e))
        })?;

        // None means the offset must be re-synchronised with HEAD.
        let mut offset: Option<u64> = Some(0);
        let mut attempt = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(upload_url).await);
            }

            let step = match offset {
                Some(sent) if sent >= total => break,
                Some(sent) => {
                    let chunk = self.read_chunk(&mut source, sent, total).await?;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(self.cancelled(upload_url).await),
                        result = self.send_chunk(upload_url, sent, chunk) => result.and_then(|next| {
                            if next > sent {
                                Ok((next, true))
                            } else {
                                Err(RequestFailure::Transient(UploadError::TransportNetwork(
                                    format!("chunk at offset {} was not acknowledged", sent),
                                )))
                            }
                        }),
                    }
                }
                None => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(self.cancelled(upload_url).await),
                        result = self.fetch_offset(upload_url) => result.map(|next| (next, false)),
                    }
                }
            };

            match step {
                Ok((next, advanced)) => {
                    if advanced {
                        attempt = 0;
                    }
                    offset = Some(next.min(total));
                    on_progress(TransferProgress::new(next.min(total), total));
                }
                Err(RequestFailure::Permanent(err)) => {
                    tracing::warn!(upload_url = %upload_url, error = %err, "Upload rejected");
                    return Err(err);
                }
                Err(RequestFailure::Transient(err)) => {
                    let Some(delay) = self.retry_delays.get(attempt).copied() else {
                        tracing::warn!(
                            upload_url = %upload_url,
                            attempts = attempt,
                            error = %err,
                            "Upload retries exhausted"
                        );
                        return Err(err);
                    };
                    attempt += 1;
                    tracing::info!(
                        upload_url = %upload_url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient upload failure, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(self.cancelled(upload_url).await),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    offset = None;
                }
            }
        }

        tracing::info!(upload_url = %upload_url, bytes = total, "Upload acknowledged");
        Ok(())
    }
}
