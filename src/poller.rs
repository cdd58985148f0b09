//! Task status polling
//!
//! The poller is a single background task that watches the [`JobStore`]. As
//! soon as the state carries a task id that still needs observing it checks
//! the remote status on a fixed interval, and it stops as soon as:
//!
//! - a terminal status (or a failed status check) has been applied,
//! - the task id changes or is cleared (e.g. by a reset),
//! - the owning [`PollerHandle`] is shut down or dropped.
//!
//! Status checks are awaited inside the tick, so at most one is in flight at
//! any time. A check still in flight when the session ends is dropped, and a
//! response for a session that is no longer current is discarded instead of
//! applied.

use crate::config::PollingConfig;
use crate::error::Result;
use crate::remote::DocumentApi;
use crate::state::{JobError, JobState, JobStore, PollKey};
use crate::types::{Event, StopReason, TaskStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

/// How a polling session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Terminal status applied; stays idle until the task changes
    Terminal,
    /// The tracked task changed or disappeared
    TaskChanged,
    /// The poller is shutting down
    Teardown,
}

impl From<SessionEnd> for StopReason {
    fn from(end: SessionEnd) -> Self {
        match end {
            SessionEnd::Terminal => StopReason::Terminal,
            SessionEnd::TaskChanged => StopReason::TaskChanged,
            SessionEnd::Teardown => StopReason::Teardown,
        }
    }
}

/// Effect of one status response on the job state
#[derive(Debug)]
enum Applied {
    Pending,
    Completed,
    Failed(JobError),
}

/// Periodic checker of the remote task status
pub struct TaskStatusPoller {
    store: JobStore,
    api: Arc<dyn DocumentApi>,
    interval: Duration,
    event_tx: broadcast::Sender<Event>,
}

impl TaskStatusPoller {
    /// Create a poller for the job in `store`
    pub fn new(
        store: JobStore,
        api: Arc<dyn DocumentApi>,
        config: &PollingConfig,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            store,
            api,
            interval: config.interval,
            event_tx,
        }
    }

    /// Start watching the store in a background task
    ///
    /// Polling stops for good when the returned handle is shut down or
    /// dropped.
    pub fn spawn(self) -> PollerHandle {
        let cancel = CancellationToken::new();
        let rx = self.store.subscribe();
        let task = tokio::spawn(self.run(rx, cancel.clone()));

        PollerHandle {
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
            task,
        }
    }

    async fn run(self, mut rx: watch::Receiver<JobState>, cancel: CancellationToken) {
        debug!(api = self.api.name(), "task status poller started");

        loop {
            let key = rx.borrow_and_update().poll_key();

            let end = match key {
                Some(key) => self.poll_session(&key, &mut rx, &cancel).await,
                None => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => SessionEnd::Teardown,
                        changed = rx.changed() => match changed {
                            Ok(()) => SessionEnd::TaskChanged,
                            Err(_) => SessionEnd::Teardown,
                        },
                    }
                }
            };

            if end == SessionEnd::Teardown {
                break;
            }
        }

        debug!("task status poller stopped");
    }

    /// Poll one task until its session ends
    async fn poll_session(
        &self,
        key: &PollKey,
        rx: &mut watch::Receiver<JobState>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        info!(
            document_id = %key.document_id,
            task_id = %key.task_id,
            interval = ?self.interval,
            "polling task status"
        );
        self.emit(Event::PollingStarted {
            task_id: key.task_id.clone(),
        });

        // First check one full interval after start
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let end = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break SessionEnd::Teardown,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break SessionEnd::Teardown;
                    }
                    if !still_polling(rx, key) {
                        break SessionEnd::TaskChanged;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(end) = self.check_once(key, rx, cancel).await {
                        break end;
                    }
                    // Next check one full interval after this response
                    ticker.reset();
                }
            }
        };

        debug!(task_id = %key.task_id, reason = ?end, "polling stopped");
        self.emit(Event::PollingStopped {
            task_id: key.task_id.clone(),
            reason: end.into(),
        });
        end
    }

    /// Run one status check; `Some` ends the session
    async fn check_once(
        &self,
        key: &PollKey,
        rx: &mut watch::Receiver<JobState>,
        cancel: &CancellationToken,
    ) -> Option<SessionEnd> {
        let check = self.api.check_status(&key.document_id, &key.task_id);
        tokio::pin!(check);

        let result = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Some(SessionEnd::Teardown),
                result = &mut check => break result,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Some(SessionEnd::Teardown);
                    }
                    if !still_polling(rx, key) {
                        debug!(task_id = %key.task_id, "dropping in-flight status check");
                        return Some(SessionEnd::TaskChanged);
                    }
                }
            }
        };

        self.apply(key, result)
    }

    /// Apply a status response if its session is still current
    fn apply(&self, key: &PollKey, result: Result<TaskStatus>) -> Option<SessionEnd> {
        let applied = self.store.update_if_current(key, |state| match &result {
            Ok(TaskStatus::Pending) => Applied::Pending,
            Ok(TaskStatus::Success) => {
                state.complete_task();
                Applied::Completed
            }
            Ok(TaskStatus::Failure) => {
                state.fail_task();
                Applied::Failed(JobError::task_failed())
            }
            Err(e) => {
                state.fail_status_check(e);
                Applied::Failed(JobError::from_status_check(e))
            }
        });

        let Some(applied) = applied else {
            warn!(task_id = %key.task_id, "discarding stale status response");
            self.emit(Event::StaleResponseDiscarded {
                task_id: key.task_id.clone(),
            });
            return Some(SessionEnd::TaskChanged);
        };

        if let Ok(status) = &result {
            debug!(task_id = %key.task_id, status = ?status, "task status checked");
            self.emit(Event::StatusChecked {
                task_id: key.task_id.clone(),
                status: *status,
                checked_at: chrono::Utc::now(),
            });
        }

        match applied {
            Applied::Pending => None,
            Applied::Completed => {
                info!(task_id = %key.task_id, "task completed, artifact ready");
                self.emit(Event::JobCompleted {
                    task_id: key.task_id.clone(),
                });
                Some(SessionEnd::Terminal)
            }
            Applied::Failed(job_error) => {
                match &result {
                    Err(e) => error!(task_id = %key.task_id, error = %e, "status check failed"),
                    Ok(_) => error!(task_id = %key.task_id, "task failed on the server"),
                }
                self.emit(Event::JobFailed {
                    task_id: key.task_id.clone(),
                    message: job_error.message,
                    code: job_error.code,
                });
                Some(SessionEnd::Terminal)
            }
        }
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// Whether the state behind `rx` still asks for polling session `key`
fn still_polling(rx: &mut watch::Receiver<JobState>, key: &PollKey) -> bool {
    rx.borrow_and_update().poll_key().as_ref() == Some(key)
}

/// Owner of a running [`TaskStatusPoller`]
///
/// Dropping the handle cancels the poller; [`PollerHandle::shutdown`] also
/// waits for it to finish.
pub struct PollerHandle {
    cancel: CancellationToken,
    _guard: DropGuard,
    task: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    /// Whether the poller task is still alive
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the poller and wait for it to stop
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "task status poller ended abnormally");
        }
    }
}
