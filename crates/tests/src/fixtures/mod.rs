pub mod portal;

use std::sync::Arc;
use std::time::Duration;

use docport_client::SessionTokens;
use docport_models::{DocumentCategory, DocumentRecord, DocumentStatus, UploadFile, UploadMetadata};
use docport_services::{DocumentStore, StoreOptions};

use self::fake::{FakeDocumentApi, FakeEventHub};

/// Initializes test logging once; repeated calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Queue tunables scaled down so timing tests finish in milliseconds.
pub fn fast_options() -> StoreOptions {
    StoreOptions {
        poll_interval: Duration::from_millis(25),
        simulate_tick: Duration::from_millis(10),
        ..StoreOptions::default()
    }
}

/// A store wired to in-memory fakes, plus handles to script them.
pub struct Harness {
    pub store: DocumentStore,
    pub api: Arc<FakeDocumentApi>,
    pub hub: Arc<FakeEventHub>,
    pub tokens: Arc<SessionTokens>,
}

pub fn harness() -> Harness {
    harness_with(fast_options())
}

pub fn harness_with(options: StoreOptions) -> Harness {
    init_tracing();
    let api = FakeDocumentApi::new();
    let hub = FakeEventHub::new();
    let tokens = Arc::new(SessionTokens::new());
    tokens.set("test-token");
    let store = DocumentStore::new(api.clone(), hub.clone(), tokens.clone(), options);
    Harness {
        store,
        api,
        hub,
        tokens,
    }
}

/// Polls `predicate` until it holds or the deadline passes; returns its
/// final value so assertions read naturally.
pub async fn wait_until(deadline: Duration, predicate: impl Fn() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    predicate()
}

pub fn make_document(id: i64, filename: &str, status: DocumentStatus) -> DocumentRecord {
    DocumentRecord {
        id,
        original_filename: filename.to_string(),
        status,
        dept_id: 1,
        project_id: 1,
        category: None,
        created_at: None,
        completed_at: None,
    }
}

/// Unique file name per test so task ids never collide across cases.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}.pdf", uuid::Uuid::new_v4().simple())
}

pub fn upload_file(name: &str) -> UploadFile {
    UploadFile::new(name, "application/pdf", b"%PDF-1.7 test payload".to_vec())
}

pub fn metadata() -> UploadMetadata {
    UploadMetadata {
        dept_id: Some(1),
        project_id: Some(1),
        user_id: Some(7),
        category: Some(DocumentCategory::Report),
    }
}
