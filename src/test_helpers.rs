//! Shared test doubles for the collaborator traits.

use crate::error::{Error, Result};
use crate::notify::{Navigator, Notifier};
use crate::remote::DocumentApi;
use crate::state::{JobState, JobStore, ResultSummary};
use crate::types::{Destination, Document, DocumentId, TaskId, TaskStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};

/// Scripted answer of the fake API
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status(TaskStatus),
    Http(u16, Option<String>),
}

impl Reply {
    fn into_result<T>(self, ok: impl FnOnce(TaskStatus) -> T) -> Result<T> {
        match self {
            Reply::Status(status) => Ok(ok(status)),
            Reply::Http(status, detail) => Err(Error::Http { status, detail }),
        }
    }
}

/// In-memory [`DocumentApi`] with scripted replies and call counters
#[derive(Default)]
pub(crate) struct FakeApi {
    statuses: Mutex<VecDeque<Reply>>,
    artifact: Mutex<Option<Reply>>,
    publish: Mutex<Option<Reply>>,
    status_delay: Mutex<Option<Duration>>,
    hold: Mutex<Option<Arc<Notify>>>,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
    pub(crate) status_calls: AtomicUsize,
    pub(crate) artifact_calls: Mutex<Vec<(DocumentId, String, Option<TaskId>)>>,
    pub(crate) publish_calls: Mutex<Vec<(DocumentId, Destination)>>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue status replies; an empty queue answers `PENDING`
    pub(crate) fn push_status(&self, reply: Reply) {
        self.statuses.lock().unwrap().push_back(reply);
    }

    /// Make the artifact endpoint answer with an HTTP error
    pub(crate) fn fail_artifact(&self, status: u16) {
        *self.artifact.lock().unwrap() = Some(Reply::Http(status, None));
    }

    /// Serve the artifact normally again
    pub(crate) fn clear_artifact_failure(&self) {
        *self.artifact.lock().unwrap() = None;
    }

    /// Make the publish endpoint answer with an HTTP error
    pub(crate) fn fail_publish(&self, status: u16) {
        *self.publish.lock().unwrap() = Some(Reply::Http(status, None));
    }

    /// Delay every status reply by `delay`
    pub(crate) fn delay_status(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = Some(delay);
    }

    /// Block status replies until the returned `Notify` is signalled
    pub(crate) fn hold_status(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn artifact_call_count(&self) -> usize {
        self.artifact_calls.lock().unwrap().len()
    }

    pub(crate) fn publish_call_count(&self) -> usize {
        self.publish_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentApi for FakeApi {
    async fn check_status(&self, _document: &DocumentId, _task_id: &TaskId) -> Result<TaskStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.status_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let hold = self.hold.lock().unwrap().clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let reply = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Status(TaskStatus::Pending));
        reply.into_result(|status| status)
    }

    async fn fetch_artifact(
        &self,
        document: &DocumentId,
        filename: &str,
        task_id: Option<&TaskId>,
    ) -> Result<Vec<u8>> {
        self.artifact_calls.lock().unwrap().push((
            document.clone(),
            filename.to_string(),
            task_id.cloned(),
        ));
        let reply = self.artifact.lock().unwrap().clone();
        match reply {
            Some(reply) => reply.into_result(|_| Vec::new()),
            None => Ok(b"anonymized bytes".to_vec()),
        }
    }

    async fn publish(&self, document: &DocumentId, destination: Destination) -> Result<()> {
        self.publish_calls
            .lock()
            .unwrap()
            .push((document.clone(), destination));
        let reply = self.publish.lock().unwrap().clone();
        match reply {
            Some(reply) => reply.into_result(|_| ()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Notifier that records every message
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) successes: Mutex<Vec<String>>,
    pub(crate) errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Navigator that counts signals
#[derive(Default)]
pub(crate) struct CountingNavigator {
    pub(crate) count: AtomicUsize,
}

impl CountingNavigator {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn return_to_submission(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A job waiting on async task `task`
pub(crate) fn pending_state(task: &str) -> JobState {
    let mut state = JobState::new();
    state.begin_submission(Document::new("doc-1", "contract.docx"));
    state.submission_accepted(
        ResultSummary {
            percent_total: 87.5,
        },
        Some(TaskId::new(task)),
    )
    .unwrap();
    state
}

/// A job whose artifact is ready
pub(crate) fn ready_state() -> JobState {
    let mut state = pending_state("t1");
    state.complete_task();
    state
}

pub(crate) fn pending_store(task: &str) -> JobStore {
    JobStore::new(pending_state(task))
}

pub(crate) fn event_channel() -> (
    broadcast::Sender<crate::types::Event>,
    broadcast::Receiver<crate::types::Event>,
) {
    broadcast::channel(256)
}

/// Collect every event currently buffered in `rx`
pub(crate) fn drain(rx: &mut broadcast::Receiver<crate::types::Event>) -> Vec<crate::types::Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
