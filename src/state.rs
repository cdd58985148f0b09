//! Shared job state and its transitions
//!
//! A [`JobState`] describes the one job a result view tracks. It is never
//! written field by field: every change goes through a named transition so
//! the presentation invariants (loading, error and ready are mutually
//! exclusive) hold after each step.
//!
//! [`JobStore`] is the shared handle. It wraps a `tokio::sync::watch` channel
//! so the poller can react when a task id appears, changes or is cleared.

use crate::error::{Error, Result};
use crate::types::{Document, DocumentId, TaskId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Message shown when the server reports the async task as failed
pub const TASK_FAILED_MESSAGE: &str = "async task failed, please retry";

/// Message shown when the status endpoint failed without a usable detail
pub const STATUS_CHECK_FAILED_MESSAGE: &str = "async task server error";

/// Error code used when no HTTP status is available
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// Computed metric of a finished job
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Share of the document that was anonymized, in percent
    pub percent_total: f64,
}

/// Error shown in the blocking error view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    /// Human-readable message
    pub message: String,
    /// HTTP-like status code
    pub code: u16,
}

impl JobError {
    /// Create a job error
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Error for a server-side task that ended in `FAILURE`
    pub fn task_failed() -> Self {
        Self::new(TASK_FAILED_MESSAGE, SERVICE_UNAVAILABLE)
    }

    /// Error for a status check that could not be completed
    ///
    /// Uses the server-provided detail when present and the response status
    /// when there was one, falling back to a generic message and 503.
    pub fn from_status_check(error: &Error) -> Self {
        Self::new(
            error.detail().unwrap_or(STATUS_CHECK_FAILED_MESSAGE),
            error.http_status().unwrap_or(SERVICE_UNAVAILABLE),
        )
    }
}

/// Identity of one polling session
///
/// The epoch changes on every new submission and every reset, so a response
/// for the same task id from an earlier job lifetime is still recognised as
/// stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollKey {
    /// Document the task belongs to
    pub document_id: DocumentId,
    /// Task being polled
    pub task_id: TaskId,
    /// Job lifetime the task was attached in
    pub epoch: u64,
}

/// State of the tracked job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobState {
    document: Option<Document>,
    task_id: Option<TaskId>,
    result_summary: Option<ResultSummary>,
    download_ready: bool,
    is_loading: bool,
    error: Option<JobError>,
    epoch: u64,
}

impl JobState {
    /// Initial empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Document the job runs on, absent in the initial shape
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Outstanding async task, if any
    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    /// Result metric, available once the server produced a result
    pub fn result_summary(&self) -> Option<ResultSummary> {
        self.result_summary
    }

    /// Whether the artifact can be downloaded or published
    pub fn download_ready(&self) -> bool {
        self.download_ready
    }

    /// Whether the submission is still in progress
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether the job failed
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The job failure, if any
    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// Job lifetime counter
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Key of the polling session this state asks for, if any
    ///
    /// Only a job that still waits on its task needs polling: once the
    /// artifact is ready or the job failed there is nothing left to observe.
    pub fn poll_key(&self) -> Option<PollKey> {
        if self.download_ready || self.is_loading || self.error.is_some() {
            return None;
        }
        match (&self.document, &self.task_id) {
            (Some(document), Some(task_id)) => Some(PollKey {
                document_id: document.id.clone(),
                task_id: task_id.clone(),
                epoch: self.epoch,
            }),
            _ => None,
        }
    }

    /// Whether a response for `key` may still be applied
    ///
    /// Only while the state still asks for exactly that polling session: a
    /// job that became ready, failed or was reset no longer accepts status
    /// responses, even for its own task.
    pub fn is_current(&self, key: &PollKey) -> bool {
        self.poll_key().as_ref() == Some(key)
    }

    /// A new document was submitted; starts a new job lifetime
    pub fn begin_submission(&mut self, document: Document) {
        *self = Self {
            document: Some(document),
            is_loading: true,
            epoch: self.epoch.wrapping_add(1),
            ..Self::default()
        };
    }

    /// The server accepted the submission
    ///
    /// Without a task id the job completed synchronously, so the artifact is
    /// ready immediately and no polling will happen. A task attached during
    /// the submission stays the job's task; the response may repeat it but
    /// not replace it.
    ///
    /// # Errors
    /// Returns [`Error::NotSubmitting`] outside the loading phase and
    /// [`Error::TaskAlreadyAttached`] if the response names a different task
    /// than the one already attached. The state is left untouched.
    pub fn submission_accepted(
        &mut self,
        summary: ResultSummary,
        task_id: Option<TaskId>,
    ) -> Result<()> {
        if !self.is_loading {
            return Err(Error::NotSubmitting);
        }
        let task_id = match (self.task_id.take(), task_id) {
            (Some(existing), Some(attempted)) if existing != attempted => {
                self.task_id = Some(existing.clone());
                return Err(Error::TaskAlreadyAttached {
                    existing,
                    attempted,
                });
            }
            (Some(existing), _) => Some(existing),
            (None, task_id) => task_id,
        };

        self.is_loading = false;
        self.error = None;
        self.result_summary = Some(summary);
        self.download_ready = task_id.is_none();
        self.task_id = task_id;
        Ok(())
    }

    /// The submission itself failed
    pub fn submission_failed(&mut self, error: JobError) {
        self.set_error(error);
    }

    /// Attach the async task created for this job
    ///
    /// # Errors
    /// Returns [`Error::TaskAlreadyAttached`] if the job already tracks a task
    /// and [`Error::NoDocument`] if no job exists.
    pub fn attach_task(&mut self, task_id: TaskId) -> Result<()> {
        if self.document.is_none() {
            return Err(Error::NoDocument);
        }
        if let Some(existing) = &self.task_id {
            return Err(Error::TaskAlreadyAttached {
                existing: existing.clone(),
                attempted: task_id,
            });
        }
        self.task_id = Some(task_id);
        self.download_ready = false;
        Ok(())
    }

    /// The task reached `SUCCESS`
    pub fn complete_task(&mut self) {
        self.is_loading = false;
        self.error = None;
        self.download_ready = true;
    }

    /// The task reached `FAILURE`
    pub fn fail_task(&mut self) {
        self.set_error(JobError::task_failed());
    }

    /// The status check itself failed
    pub fn fail_status_check(&mut self, error: &Error) {
        self.set_error(JobError::from_status_check(error));
    }

    /// Return to the initial empty shape
    pub fn reset(&mut self) {
        *self = Self {
            epoch: self.epoch.wrapping_add(1),
            ..Self::default()
        };
    }

    fn set_error(&mut self, error: JobError) {
        self.is_loading = false;
        self.download_ready = false;
        self.error = Some(error);
    }
}

/// Shared, observable handle to the job state
#[derive(Clone, Debug)]
pub struct JobStore {
    tx: watch::Sender<JobState>,
    // Serializes transitions so each one applies to the latest state
    writer: Arc<Mutex<()>>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(JobState::default())
    }
}

impl JobStore {
    /// Create a store holding `state`
    pub fn new(state: JobState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            tx,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> JobState {
        self.tx.borrow().clone()
    }

    /// Read the current state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&JobState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Apply a transition and notify watchers if the state changed
    pub fn update<R>(&self, f: impl FnOnce(&mut JobState) -> R) -> R {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = self.tx.borrow().clone();
        let output = f(&mut next);
        self.tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        output
    }

    /// Apply a transition only if the polling session `key` is still current
    ///
    /// Returns `None` and leaves the state untouched for a stale key.
    pub fn update_if_current<R>(
        &self,
        key: &PollKey,
        f: impl FnOnce(&mut JobState) -> R,
    ) -> Option<R> {
        self.update(|state| state.is_current(key).then(|| f(state)))
    }

    /// Watch the state for changes
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.tx.subscribe()
    }
}
