//! Test helpers: in-memory collaborators and an orchestrator wired to them.
//!
//! Run from workspace root: `cargo test -p vidcast-upload --test workflow_test`.

#![allow(dead_code)]

pub mod fakes;

use std::sync::Arc;
use std::time::Duration;
use vidcast_core::models::{StreamValue, UploadFile};
use vidcast_core::UploadConfig;
use vidcast_storage::MemoryRecordStore;
use vidcast_upload::{RecordSink, UploadOrchestrator};

use fakes::{FakeProvider, FakeTransport};

pub const DOCUMENT_ID: &str = "video-intro";

pub struct TestApp {
    pub orchestrator: Arc<UploadOrchestrator>,
    pub provider: Arc<FakeProvider>,
    pub transport: Arc<FakeTransport>,
    pub store: Arc<MemoryRecordStore>,
}

impl TestApp {
    pub async fn record(&self) -> StreamValue {
        use vidcast_storage::RecordStore;
        self.store.load(DOCUMENT_ID).await.unwrap()
    }
}

pub fn test_config() -> UploadConfig {
    UploadConfig {
        chunk_size_bytes: 10 * 1024 * 1024,
        retry_delays: vec![Duration::ZERO],
        poll_interval: Duration::from_secs(4),
        processing_timeout: Duration::from_secs(300),
        http_timeout: Duration::from_secs(5),
    }
}

/// 50 MB clip; the fake transport never touches the path.
pub fn clip() -> UploadFile {
    UploadFile::new(
        "/videos/clip.mp4",
        "clip.mp4",
        Some("video/mp4"),
        50 * 1024 * 1024,
    )
}

pub fn existing_record() -> StreamValue {
    StreamValue {
        playback_id: Some("old-pb".to_string()),
        asset_id: Some("old-uid".to_string()),
        duration: Some(33.0),
        thumbnail_url: Some("https://videodelivery.net/old-pb/thumbnails/thumbnail.jpg".to_string()),
        uploaded_at: None,
    }
}

pub fn setup_test_app(
    provider: FakeProvider,
    transport: FakeTransport,
    record: Option<StreamValue>,
) -> TestApp {
    let store = match record {
        Some(value) => MemoryRecordStore::new().with_record(DOCUMENT_ID, value),
        None => MemoryRecordStore::new(),
    };
    setup_test_app_with_store(provider, transport, store)
}

pub fn setup_test_app_with_store(
    provider: FakeProvider,
    transport: FakeTransport,
    store: MemoryRecordStore,
) -> TestApp {
    let store = Arc::new(store);
    let provider = Arc::new(provider);
    let transport = Arc::new(transport);

    let orchestrator = UploadOrchestrator::new(
        provider.clone(),
        transport.clone(),
        RecordSink::new(store.clone(), DOCUMENT_ID),
        test_config(),
    );

    TestApp {
        orchestrator: Arc::new(orchestrator),
        provider,
        transport,
        store,
    }
}
