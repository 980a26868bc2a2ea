//! vidcast Storage Library
//!
//! This crate provides the [`RecordStore`] abstraction the upload sink writes
//! through, with an in-memory backend and a local filesystem backend.
//!
//! # Document ids
//!
//! Records are addressed by a document id (e.g. `video-intro`). Ids must not
//! contain `..`, path separators or a leading `.`; the local backend maps each
//! id to `{base_path}/{document_id}.json`.

#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-local")]
pub use local::LocalRecordStore;
pub use memory::MemoryRecordStore;
pub use traits::{RecordStore, StorageError, StorageResult};
