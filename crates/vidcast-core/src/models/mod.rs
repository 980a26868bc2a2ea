//! Data models for the upload workflow
//!
//! Local file handles, provider upload targets, processing snapshots and the
//! persisted stream fields of a video document.

mod asset;
mod file;
mod record;
mod target;

// Re-export all models for convenient imports
pub use asset::{AssetStatus, StatusVerdict};
pub use file::UploadFile;
pub use record::{Enrichment, RecordPatch, StreamValue};
pub use target::{CreateUploadRequest, UploadTarget};
