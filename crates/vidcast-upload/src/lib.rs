//! Upload workflow for Cloudflare Stream.
//!
//! The [`UploadOrchestrator`] requests a direct upload target, runs the
//! transport, polls processing status and finally commits the playback id to
//! the record (or rolls it back). Progress is published as [`UploadStatus`]
//! values produced by a pure state machine.

pub mod orchestrator;
pub mod poller;
pub mod progress;
pub mod sink;
pub mod state;

pub use orchestrator::{UploadOrchestrator, UploadOutcome};
pub use poller::{ReadyAsset, StatusObserver, StatusPoller};
pub use progress::ProgressRange;
pub use sink::{RecordSink, SessionSink};
pub use state::{StatusError, UploadEvent, UploadStage, UploadStatus};
