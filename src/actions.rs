//! Result actions and their enablement
//!
//! Download and publish are only permitted once the artifact is ready; reset
//! is always permitted. Each action runs its own request/response cycle and
//! reports the outcome to the [`Notifier`]. Actions never touch the job
//! state, so a failed action can simply be triggered again.

use crate::notify::Notifier;
use crate::remote::DocumentApi;
use crate::state::{JobState, JobStore};
use crate::types::{Destination, Document, TaskId};
use crate::utils::download_file_name;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Notification after the artifact was saved
pub const DOWNLOAD_SUCCEEDED: &str = "Document ready";

/// Notification when the server has not produced the artifact yet
pub const DOWNLOAD_NOT_READY: &str = "The document is not available yet";

/// Notification for any other download failure
pub const DOWNLOAD_FAILED: &str = "Could not download the document";

/// Notification after a successful publish to `destination`
pub fn publish_succeeded_message(destination: Destination) -> String {
    format!(
        "The anonymized document was published to your {} account",
        destination.display_name()
    )
}

/// Notification after a failed publish to `destination`
pub fn publish_failed_message(destination: Destination) -> String {
    format!(
        "Could not publish the document to {}",
        destination.display_name()
    )
}

/// A user-triggerable action of the result view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Download the anonymized artifact
    Download,
    /// Publish the artifact to an external destination
    Publish(Destination),
    /// Start the reset confirmation
    Reset,
}

/// Which actions are currently permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSet {
    /// Download is enabled
    pub download: bool,
    /// Publish to Dropbox is enabled
    pub publish_dropbox: bool,
    /// Publish to Google Drive is enabled
    pub publish_drive: bool,
    /// Reset is enabled
    pub reset: bool,
}

impl ActionSet {
    /// Derive the enabled actions from the job state
    pub fn for_state(state: &JobState) -> Self {
        let ready = state.download_ready();
        Self {
            download: ready,
            publish_dropbox: ready,
            publish_drive: ready,
            reset: true,
        }
    }

    /// Whether `action` is enabled
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Download => self.download,
            Action::Publish(Destination::Dropbox) => self.publish_dropbox,
            Action::Publish(Destination::GoogleDrive) => self.publish_drive,
            Action::Reset => self.reset,
        }
    }
}

/// Result of running a download or publish action
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action succeeded; the success notification was sent
    Completed,
    /// The artifact is not produced yet (HTTP 409); a soft error was notified
    NotReady,
    /// The action failed; an error notification was sent
    Failed,
    /// The action is not enabled; nothing was requested or notified
    Blocked,
}

/// Executes the remote actions of the result view behind their gate
#[derive(Clone)]
pub struct ResultActionGate {
    store: JobStore,
    api: Arc<dyn DocumentApi>,
    notifier: Arc<dyn Notifier>,
    download_dir: PathBuf,
}

impl ResultActionGate {
    /// Create a gate over the job in `store`
    pub fn new(
        store: JobStore,
        api: Arc<dyn DocumentApi>,
        notifier: Arc<dyn Notifier>,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            api,
            notifier,
            download_dir,
        }
    }

    /// Currently enabled actions
    pub fn permitted(&self) -> ActionSet {
        self.store.read(ActionSet::for_state)
    }

    /// Document and task to act on, if `action` is enabled
    fn target(&self, action: Action) -> Option<(Document, Option<TaskId>)> {
        self.store.read(|state| {
            if !ActionSet::for_state(state).allows(action) {
                return None;
            }
            state
                .document()
                .cloned()
                .map(|document| (document, state.task_id().cloned()))
        })
    }

    /// Download the artifact into the download directory
    pub async fn download(&self) -> ActionOutcome {
        let Some((document, task_id)) = self.target(Action::Download) else {
            debug!("download blocked, artifact not ready");
            return ActionOutcome::Blocked;
        };

        let filename = download_file_name(&document.name);
        match self.fetch_and_store(&document, &filename, task_id.as_ref()).await {
            Ok(path) => {
                info!(document_id = %document.id, path = %path.display(), "document downloaded");
                self.notifier.notify_success(DOWNLOAD_SUCCEEDED);
                ActionOutcome::Completed
            }
            Err(e) if e.is_conflict() => {
                warn!(document_id = %document.id, "document not available yet");
                self.notifier.notify_error(DOWNLOAD_NOT_READY);
                ActionOutcome::NotReady
            }
            Err(e) => {
                error!(document_id = %document.id, error = %e, "download failed");
                self.notifier.notify_error(DOWNLOAD_FAILED);
                ActionOutcome::Failed
            }
        }
    }

    async fn fetch_and_store(
        &self,
        document: &Document,
        filename: &str,
        task_id: Option<&TaskId>,
    ) -> crate::Result<PathBuf> {
        let bytes = self
            .api
            .fetch_artifact(&document.id, filename, task_id)
            .await?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }

    /// Publish the artifact to `destination`
    pub async fn publish(&self, destination: Destination) -> ActionOutcome {
        let Some((document, _)) = self.target(Action::Publish(destination)) else {
            debug!(?destination, "publish blocked, artifact not ready");
            return ActionOutcome::Blocked;
        };

        match self.api.publish(&document.id, destination).await {
            Ok(()) => {
                info!(document_id = %document.id, ?destination, "document published");
                self.notifier
                    .notify_success(&publish_succeeded_message(destination));
                ActionOutcome::Completed
            }
            Err(e) => {
                error!(document_id = %document.id, ?destination, error = %e, "publish failed");
                self.notifier
                    .notify_error(&publish_failed_message(destination));
                ActionOutcome::Failed
            }
        }
    }
}
