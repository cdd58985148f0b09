//! Common test utilities for the integration tests

#![allow(dead_code)]

use anonymizer_client::{
    Config, Document, JobState, JobStore, Navigator, ResultSummary, TaskId,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::MockServer;

pub const DOCUMENT_ID: &str = "42";
pub const DOCUMENT_NAME: &str = "contract.docx";
pub const TASK_ID: &str = "abc-123";

/// Config pointing at `server`, polling fast enough for real-time tests
pub fn config_for(server: &MockServer, download_dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api", server.uri());
    config.api.timeout = Duration::from_secs(5);
    config.polling.interval = Duration::from_millis(50);
    config.download.download_dir = download_dir.to_path_buf();
    config
}

/// A job whose submission was accepted with a pending async task
pub fn pending_store() -> JobStore {
    let mut state = JobState::new();
    state.begin_submission(Document::new(DOCUMENT_ID, DOCUMENT_NAME));
    state.submission_accepted(
        ResultSummary {
            percent_total: 64.0,
        },
        Some(TaskId::new(TASK_ID)),
    )
    .unwrap();
    JobStore::new(state)
}

/// Navigator that counts how often it was signalled
#[derive(Default)]
pub struct NavCounter(AtomicUsize);

impl NavCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Navigator for NavCounter {
    fn return_to_submission(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
