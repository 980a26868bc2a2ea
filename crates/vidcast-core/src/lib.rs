//! vidcast Core Library
//!
//! This crate provides domain models, error types, configuration and the
//! collaborator traits shared by every vidcast component.

pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod provider;

// Re-export commonly used types
pub use config::{StreamConfig, UploadConfig};
pub use error::{ErrorMetadata, LogLevel, UploadError, UploadResult};
pub use provider::{ProgressCallback, StreamProvider, TransferProgress, Transport};
pub use tokio_util::sync::CancellationToken;
