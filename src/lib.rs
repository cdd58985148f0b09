//! # anonymizer-client
//!
//! Client-side coordinator for a remote document anonymization job.
//!
//! After a document has been submitted, the server may keep working on it
//! in an asynchronous task. This crate tracks that one job:
//! - **Polling** - the task status is checked on a fixed interval until it
//!   succeeds or fails, and never after the job is reset or the view is gone
//! - **Gated actions** - download and publish (Dropbox, Google Drive) are
//!   only reachable once the artifact is ready
//! - **Confirmed reset** - a two-step confirm/cancel flow clears the job and
//!   signals a return to the submission view
//! - **Event-driven** - consumers subscribe to [`Event`]s and render
//!   [`Presentation`]s, no UI toolkit involved
//!
//! ## Quick Start
//!
//! ```no_run
//! use anonymizer_client::{
//!     Config, Document, JobStore, ResultSummary, ResultView, TaskId,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = JobStore::default();
//!     let view = ResultView::mount_http(
//!         &Config::default(),
//!         store.clone(),
//!         Arc::new(|| println!("back to submission")),
//!     )?;
//!
//!     // The submission flow fills the job in
//!     store.update(|job| {
//!         job.begin_submission(Document::new("42", "contract.docx"));
//!         job.submission_accepted(ResultSummary { percent_total: 12.5 }, Some(TaskId::new("abc")))
//!     })?;
//!
//!     let mut events = view.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!         println!("Showing: {:?}", view.present());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// User actions on the result and their gate
pub mod actions;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Notification and navigation collaborators
pub mod notify;
/// Task status polling
pub mod poller;
/// Remote document API
pub mod remote;
/// Reset confirmation
pub mod reset;
/// Job state and its shared store
pub mod state;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Result view coordination
pub mod view;

// unwrap/expect are acceptable in test doubles
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use actions::{Action, ActionOutcome, ActionSet, ResultActionGate};
pub use config::{ApiConfig, Config, DownloadConfig, PollingConfig};
pub use error::{Error, Result};
pub use notify::{EventNotifier, Navigator, Notifier};
pub use poller::{PollerHandle, TaskStatusPoller};
pub use remote::{DocumentApi, HttpDocumentApi};
pub use reset::{ResetConfirmationFlow, ResetPhase};
pub use state::{JobError, JobState, JobStore, PollKey, ResultSummary};
pub use types::{
    Destination, Document, DocumentId, Event, Notification, NotificationLevel, StopReason,
    TaskId, TaskStatus,
};
pub use view::{Collaborators, Presentation, ResultView, select_presentation};

/// Keep a mounted view alive until a termination signal arrives, then tear
/// it down.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_until_shutdown(view: ResultView) {
    wait_for_signal().await;
    view.teardown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for Ctrl+C only");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
